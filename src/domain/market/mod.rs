// Market analysis domain
pub mod indicator_config;
pub mod indicator_set;
pub mod price_series;
