pub mod forecast;
pub mod model_record;
