// Per-symbol indicator and signal analysis
pub mod analyst;

// Indicator engine
pub mod indicators;

// Cross detection and signal generation
pub mod market_data;

// Forecast models, registry and service
pub mod ml;
