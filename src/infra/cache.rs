//! Durable on-disk cache for records not yet persisted remotely.
//!
//! One JSON document holding the full unsynced-record list. The cache is the
//! authoritative home of a record until the remote store acknowledges it;
//! after that the remote copy wins and the entry is dropped here.

use std::{fs, io, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::record::CalculationRecord;

const CACHE_DIR: &str = "cargo-valuator";
const CACHE_FILENAME: &str = "history_cache.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("local data directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// The cached document: every record still exclusively owned by this device.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistoryCache {
    pub records: Vec<CalculationRecord>,
}

/// Handle to the cache file.
#[derive(Clone, Debug)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    /// Cache in the platform-local app data directory.
    pub fn open_default() -> Result<Self, CacheError> {
        let base = dirs::data_local_dir()
            .ok_or(CacheError::StorageUnavailable)?
            .join(CACHE_DIR);
        Ok(Self {
            path: base.join(CACHE_FILENAME),
        })
    }

    /// Cache at an explicit path (tests, portable installs).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the cached list. A missing file is an empty history; an
    /// unreadable or unparsable file is logged and treated the same, never
    /// surfaced as a hard failure on the read path.
    pub fn load(&self) -> HistoryCache {
        if !self.path.exists() {
            return HistoryCache::default();
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(cache) => cache,
                Err(error) => {
                    tracing::warn!(path = %self.path.display(), %error, "unparsable history cache, starting empty");
                    HistoryCache::default()
                }
            },
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "unreadable history cache, starting empty");
                HistoryCache::default()
            }
        }
    }

    pub fn save(&self, cache: &HistoryCache) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(cache)?;
        fs::write(&self.path, json)?;
        tracing::debug!(
            path = %self.path.display(),
            records = cache.records.len(),
            "saved history cache"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{local_record_id, RecordResults};
    use time::OffsetDateTime;

    fn sample_record() -> CalculationRecord {
        let created_at = OffsetDateTime::now_utc();
        CalculationRecord {
            id: local_record_id(created_at),
            uid: None,
            date: "24/08/2026 10:00:00".to_string(),
            created_at,
            product_type: "Tomate".to_string(),
            mlih_price: 85.0,
            dichi_price: 70.0,
            results: RecordResults {
                grand_total_price: 8543.7,
                grand_total_price_riyal: 170874.07,
                total_net_weight: 2920.0,
                total_virtual_crates: 108.15,
            },
            client_name: "Hamid".to_string(),
            farm: "Ouled Said".to_string(),
            remaining_crates: 0.0,
            remaining_money: 0.0,
            total_crates: 120.0,
            mlih_agreed_price: 0.0,
            dichi_agreed_price: 0.0,
            synced: false,
        }
    }

    #[test]
    fn missing_file_loads_as_empty_history() {
        let temp = tempfile::tempdir().unwrap();
        let cache = LocalCache::at(temp.path().join("missing.json"));
        assert!(cache.load().records.is_empty());
    }

    #[test]
    fn corrupt_file_loads_as_empty_history() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("history_cache.json");
        fs::write(&path, "{not json").unwrap();
        assert!(LocalCache::at(path).load().records.is_empty());
    }

    #[test]
    fn records_round_trip_through_disk() {
        let temp = tempfile::tempdir().unwrap();
        let cache = LocalCache::at(temp.path().join("nested").join("history_cache.json"));
        let record = sample_record();
        cache
            .save(&HistoryCache {
                records: vec![record.clone()],
            })
            .unwrap();

        let loaded = cache.load();
        assert_eq!(loaded.records, vec![record]);
    }
}
