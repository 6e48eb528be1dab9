pub mod evaluator;
pub mod forecaster;
pub mod linear_predictor;
pub mod model_config;
pub mod model_handle;
pub mod predictor;
pub mod preprocessor;
pub mod recurrent_predictor;
pub mod registry;
pub mod trainer;

pub use forecaster::ForecastService;
pub use model_config::{ForecastConfig, RegistryConfig};
pub use model_handle::ModelHandle;
pub use predictor::{ForecastModel, ForecastPredictor, ModelFactory};
pub use registry::{ModelRegistry, RegistryStats};
pub use trainer::{DefaultModelTrainer, ModelTrainer};
