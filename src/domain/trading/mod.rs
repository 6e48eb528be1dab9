// Trading signal value objects
pub mod signal;
