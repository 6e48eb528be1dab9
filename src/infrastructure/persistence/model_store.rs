//! Model store implementations.
//!
//! - `InMemoryModelStore`: default, process-local
//! - `FileModelStore`: one JSON document per version, `{SYMBOL}_v{version}.json`

use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use crate::domain::ml::model_record::ModelRecord;
use crate::domain::ports::ModelStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Keeps every saved version in memory. Data is lost on restart.
pub struct InMemoryModelStore {
    records: RwLock<HashMap<String, BTreeMap<u64, ModelRecord>>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryModelStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn save(&self, record: &ModelRecord) -> AnalyticsResult<()> {
        let mut records = self.records.write().await;
        records
            .entry(record.symbol.to_uppercase())
            .or_default()
            .insert(record.version, record.clone());
        Ok(())
    }

    async fn load_latest(&self, symbol: &str) -> AnalyticsResult<Option<ModelRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&symbol.to_uppercase())
            .and_then(|versions| versions.values().next_back().cloned()))
    }

    async fn versions(&self, symbol: &str) -> AnalyticsResult<Vec<u64>> {
        let records = self.records.read().await;
        Ok(records
            .get(&symbol.to_uppercase())
            .map(|versions| versions.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn prune(&self, symbol: &str, keep: usize) -> AnalyticsResult<usize> {
        let mut records = self.records.write().await;
        let Some(versions) = records.get_mut(&symbol.to_uppercase()) else {
            return Ok(0);
        };
        let excess = versions.len().saturating_sub(keep);
        let doomed: Vec<u64> = versions.keys().take(excess).copied().collect();
        for version in &doomed {
            versions.remove(version);
        }
        Ok(doomed.len())
    }
}

/// Stores each version as a pretty-printed JSON file under `dir`.
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    /// Creates the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> AnalyticsResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AnalyticsError::persistence(format!("create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str, version: u64) -> PathBuf {
        self.dir
            .join(format!("{}_v{}.json", Self::file_stem(symbol), version))
    }

    /// Upper-cased symbol with every byte outside `[A-Z0-9._-]` written as
    /// `%XX`, so `BTC/USD` stays a single file name.
    fn file_stem(symbol: &str) -> String {
        let mut stem = String::with_capacity(symbol.len());
        for byte in symbol.to_uppercase().bytes() {
            match byte {
                b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => stem.push(byte as char),
                b'.' if !stem.is_empty() => stem.push('.'),
                _ => stem.push_str(&format!("%{:02X}", byte)),
            }
        }
        stem
    }

    /// Version encoded in a file name belonging to `stem`, if any.
    fn parse_version(file_name: &str, stem: &str) -> Option<u64> {
        file_name
            .strip_suffix(".json")?
            .strip_prefix(stem)?
            .strip_prefix("_v")?
            .parse()
            .ok()
    }
}

#[async_trait]
impl ModelStore for FileModelStore {
    async fn save(&self, record: &ModelRecord) -> AnalyticsResult<()> {
        let path = self.path_for(&record.symbol, record.version);
        let json = serde_json::to_vec_pretty(record).map_err(|e| {
            AnalyticsError::persistence(format!(
                "serialize {} v{}: {}",
                record.symbol, record.version, e
            ))
        })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| AnalyticsError::persistence(format!("write {}: {}", path.display(), e)))?;
        debug!("FileModelStore: wrote {}", path.display());
        Ok(())
    }

    async fn load_latest(&self, symbol: &str) -> AnalyticsResult<Option<ModelRecord>> {
        let Some(&version) = self.versions(symbol).await?.last() else {
            return Ok(None);
        };
        let path = self.path_for(symbol, version);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AnalyticsError::persistence(format!("read {}: {}", path.display(), e)))?;
        let record = serde_json::from_slice(&bytes)
            .map_err(|e| AnalyticsError::persistence(format!("parse {}: {}", path.display(), e)))?;
        Ok(Some(record))
    }

    async fn versions(&self, symbol: &str) -> AnalyticsResult<Vec<u64>> {
        let stem = Self::file_stem(symbol);
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            AnalyticsError::persistence(format!("list {}: {}", self.dir.display(), e))
        })?;

        let mut versions = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|e| {
                AnalyticsError::persistence(format!("list {}: {}", self.dir.display(), e))
            })?;
            let Some(entry) = entry else { break };
            let name = entry.file_name();
            if let Some(version) = name.to_str().and_then(|n| Self::parse_version(n, &stem)) {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    async fn prune(&self, symbol: &str, keep: usize) -> AnalyticsResult<usize> {
        let versions = self.versions(symbol).await?;
        let excess = versions.len().saturating_sub(keep);
        let mut removed = 0;
        for &version in &versions[..excess] {
            let path = self.path_for(symbol, version);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("FileModelStore: could not remove {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::forecast::{AccuracyMetrics, ModelKind};
    use chrono::Utc;

    fn record(symbol: &str, version: u64) -> ModelRecord {
        ModelRecord {
            symbol: symbol.to_string(),
            version,
            kind: ModelKind::Linear,
            trained_at: Utc::now(),
            degraded_mode: true,
            metrics: AccuracyMetrics::default(),
            state: serde_json::json!({ "version": version }),
        }
    }

    #[tokio::test]
    async fn test_in_memory_latest_and_prune() {
        let store = InMemoryModelStore::new();
        for v in 1..=5 {
            store.save(&record("AAPL", v)).await.unwrap();
        }
        store.save(&record("MSFT", 1)).await.unwrap();

        assert_eq!(store.versions("aapl").await.unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(store.load_latest("AAPL").await.unwrap().unwrap().version, 5);

        assert_eq!(store.prune("AAPL", 3).await.unwrap(), 2);
        assert_eq!(store.versions("AAPL").await.unwrap(), vec![3, 4, 5]);
        assert_eq!(store.versions("MSFT").await.unwrap(), vec![1]);
        assert!(store.load_latest("TSLA").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::open(dir.path().join("models")).await.unwrap();

        store.save(&record("AAPL", 1)).await.unwrap();
        store.save(&record("AAPL", 2)).await.unwrap();
        store.save(&record("AAPLX", 9)).await.unwrap();

        assert!(store.dir().join("AAPL_v2.json").exists());
        assert_eq!(store.versions("AAPL").await.unwrap(), vec![1, 2]);

        let latest = store.load_latest("AAPL").await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.state, serde_json::json!({ "version": 2 }));
    }

    #[tokio::test]
    async fn test_file_store_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::open(dir.path()).await.unwrap();
        for v in 1..=4 {
            store.save(&record("NVDA", v)).await.unwrap();
        }

        assert_eq!(store.prune("NVDA", 3).await.unwrap(), 1);
        assert_eq!(store.versions("NVDA").await.unwrap(), vec![2, 3, 4]);
        assert!(!dir.path().join("NVDA_v1.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::open(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("AMD_v1.json"), b"{not json")
            .await
            .unwrap();

        let err = store.load_latest("AMD").await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Persistence { .. }));
    }

    #[tokio::test]
    async fn test_file_store_escapes_path_separators() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::open(dir.path()).await.unwrap();

        store.save(&record("BTC/USD", 1)).await.unwrap();
        store.save(&record("BTC/USD", 2)).await.unwrap();
        store.save(&record("..", 1)).await.unwrap();

        assert!(dir.path().join("BTC%2FUSD_v2.json").exists());
        assert_eq!(store.versions("btc/usd").await.unwrap(), vec![1, 2]);
        assert_eq!(store.load_latest("BTC/USD").await.unwrap().unwrap().version, 2);
        assert_eq!(store.prune("BTC/USD", 1).await.unwrap(), 1);
        assert_eq!(store.versions("BTC/USD").await.unwrap(), vec![2]);

        assert_eq!(store.versions("..").await.unwrap(), vec![1]);
        assert!(store.versions("BTC").await.unwrap().is_empty());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(FileModelStore::file_stem("brk.b"), "BRK.B");
        assert_eq!(FileModelStore::file_stem("BTC/USD"), "BTC%2FUSD");
        assert_eq!(FileModelStore::file_stem(".."), "%2E.");
        assert_eq!(FileModelStore::file_stem("a\\b%"), "A%5CB%25");
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(FileModelStore::parse_version("AAPL_v12.json", "AAPL"), Some(12));
        assert_eq!(FileModelStore::parse_version("AAPLX_v1.json", "AAPL"), None);
        assert_eq!(FileModelStore::parse_version("AAPL_v1.tmp", "AAPL"), None);
    }
}
