// Price history, indicator values and their configuration
pub mod market;

// Forecast requests, results and persisted model records
pub mod ml;

// Port interfaces
pub mod ports;

// Signal verdicts
pub mod trading;

// Domain-specific error types
pub mod errors;
