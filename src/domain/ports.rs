use crate::domain::errors::AnalyticsResult;
use crate::domain::ml::model_record::ModelRecord;
use async_trait::async_trait;

/// Storage for trained model versions, keyed by symbol and version.
#[async_trait]
pub trait ModelStore: Send + Sync {
    async fn save(&self, record: &ModelRecord) -> AnalyticsResult<()>;

    /// Highest stored version for the symbol, if any.
    async fn load_latest(&self, symbol: &str) -> AnalyticsResult<Option<ModelRecord>>;

    /// Stored versions for the symbol in ascending order.
    async fn versions(&self, symbol: &str) -> AnalyticsResult<Vec<u64>>;

    /// Deletes all but the `keep` most recent versions; returns how many were removed.
    async fn prune(&self, symbol: &str, keep: usize) -> AnalyticsResult<usize>;
}
