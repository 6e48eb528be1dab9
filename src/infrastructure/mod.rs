pub mod factory;
pub mod observability;
pub mod persistence;

pub use factory::ServiceFactory;
pub use observability::init_tracing;
pub use persistence::{FileModelStore, InMemoryModelStore};
