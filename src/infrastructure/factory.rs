use crate::application::analyst::TechnicalAnalyst;
use crate::application::ml::forecaster::ForecastService;
use crate::application::ml::registry::ModelRegistry;
use crate::application::ml::trainer::DefaultModelTrainer;
use crate::config::{AnalyticsConfig, RegistryEnvConfig};
use crate::domain::ports::ModelStore;
use crate::infrastructure::persistence::model_store::{FileModelStore, InMemoryModelStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Builds the runtime services from loaded configuration.
pub struct ServiceFactory;

impl ServiceFactory {
    pub async fn create_model_store(config: &RegistryEnvConfig) -> Result<Arc<dyn ModelStore>> {
        match &config.store_dir {
            Some(dir) => {
                let store = FileModelStore::open(dir)
                    .await
                    .with_context(|| format!("Failed to open model store at {}", dir.display()))?;
                info!("ServiceFactory: file model store at {}", dir.display());
                Ok(Arc::new(store))
            }
            None => {
                info!("ServiceFactory: in-memory model store");
                Ok(Arc::new(InMemoryModelStore::new()))
            }
        }
    }

    pub async fn create_forecast_service(config: &AnalyticsConfig) -> Result<ForecastService> {
        let forecast = config.forecast.to_forecast_config()?;
        let registry_config = config.registry.to_registry_config()?;
        let store = Self::create_model_store(&config.registry).await?;
        let trainer = Arc::new(DefaultModelTrainer::new(forecast.clone()));

        let registry = ModelRegistry::new(registry_config, store, trainer)
            .context("Failed to create model registry")?;
        ForecastService::new(registry, forecast).context("Failed to create forecast service")
    }

    pub fn create_analyst(config: &AnalyticsConfig) -> Result<TechnicalAnalyst> {
        Ok(TechnicalAnalyst::new(config.indicators.to_indicator_config()?))
    }
}
