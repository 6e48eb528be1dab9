pub mod model_store;

pub use model_store::{FileModelStore, InMemoryModelStore};
