use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sentinel_common::TleRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Persisted cache file name
const CACHE_FILE: &str = "tle_cache.json";
/// Written first, then renamed over [`CACHE_FILE`]
const CACHE_TMP_FILE: &str = "tle_cache.json.tmp";

/// Shared, immutable batch of parsed records
pub type RecordBatch = Arc<Vec<TleRecord>>;

/// Cache slot identifier, one per distinct query shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_limit(limit: usize) -> Self {
        Self(format!("tle_active_{}", limit))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub records: RecordBatch,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    key: String,
    fetched_at: DateTime<Utc>,
    records: Vec<TleRecord>,
}

/// Time-bounded TLE store. Entries are replaced whole, never edited.
pub struct TleCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl TleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &CacheKey) -> Option<RecordBatch> {
        self.get_at(key, Utc::now()).await
    }

    /// Records for `key` if they were fetched less than one TTL before `now`.
    pub async fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<RecordBatch> {
        let entries = self.entries.read().await;
        let entry = entries.get(key.as_str())?;

        if now - entry.fetched_at < self.ttl {
            debug!("Using cached TLE data for {}", key.as_str());
            Some(entry.records.clone())
        } else {
            debug!("Cached TLE data for {} is stale", key.as_str());
            None
        }
    }

    pub async fn put(&self, key: &CacheKey, records: Vec<TleRecord>) -> RecordBatch {
        self.put_at(key, records, Utc::now()).await
    }

    pub async fn put_at(
        &self,
        key: &CacheKey,
        records: Vec<TleRecord>,
        now: DateTime<Utc>,
    ) -> RecordBatch {
        let records = Arc::new(records);
        let entry = CacheEntry {
            key: key.as_str().to_string(),
            records: records.clone(),
            fetched_at: now,
        };

        self.entries
            .write()
            .await
            .insert(entry.key.clone(), entry);

        info!("Cached TLE data for {} ({} satellites)", key.as_str(), records.len());
        records
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    fn cache_path(dir: &Path) -> PathBuf {
        dir.join(CACHE_FILE)
    }

    /// Write every entry to `dir` so a restart can skip an upstream fetch.
    pub async fn save_to_dir(&self, dir: &Path) -> Result<()> {
        let persisted: Vec<PersistedEntry> = self
            .entries
            .read()
            .await
            .values()
            .map(|entry| PersistedEntry {
                key: entry.key.clone(),
                fetched_at: entry.fetched_at,
                records: entry.records.as_ref().clone(),
            })
            .collect();

        fs::create_dir_all(dir)
            .await
            .context("Failed to create cache directory")?;

        let content = serde_json::to_string_pretty(&persisted)
            .context("Failed to serialize TLE cache")?;
        let tmp_path = dir.join(CACHE_TMP_FILE);
        fs::write(&tmp_path, content)
            .await
            .context("Failed to write TLE cache file")?;
        fs::rename(&tmp_path, Self::cache_path(dir))
            .await
            .context("Failed to replace TLE cache file")?;

        debug!("Saved {} TLE cache entries", persisted.len());
        Ok(())
    }

    /// Load entries saved by [`TleCache::save_to_dir`]. Freshness is still
    /// judged on read, so stale entries simply miss.
    pub async fn load_from_dir(&self, dir: &Path) -> Result<usize> {
        let path = Self::cache_path(dir);
        if !path.exists() {
            debug!("Cache file does not exist: {:?}", path);
            return Ok(0);
        }

        let content = fs::read_to_string(&path)
            .await
            .context("Failed to read TLE cache file")?;
        let persisted: Vec<PersistedEntry> =
            serde_json::from_str(&content).context("Failed to parse TLE cache file")?;

        let mut entries = self.entries.write().await;
        for entry in persisted {
            entries.insert(
                entry.key.clone(),
                CacheEntry {
                    key: entry.key,
                    records: Arc::new(entry.records),
                    fetched_at: entry.fetched_at,
                },
            );
        }

        info!("Loaded {} TLE cache entries from {:?}", entries.len(), path);
        Ok(entries.len())
    }
}
