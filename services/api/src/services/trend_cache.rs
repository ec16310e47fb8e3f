//! services/api/src/services/trend_cache.rs
//!
//! Cache of fetched trends keyed by (region, topic), persisted in the key/value
//! store. Entries never expire by time; only a forced refresh replaces them.
//!
//! With a capacity of one the stored record is a single `{country, topic, data}`
//! object, the same shape the browser client has always written. Larger
//! capacities store a list of those records, newest first, evicting the oldest
//! write.

use std::sync::Arc;

use analista_core::domain::TrendResponse;
use analista_core::ports::{KeyValueStore, PortError, PortResult};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const TRENDS_CACHE_KEY: &str = "analista_plus_trends_cache";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    country: String,
    topic: String,
    data: TrendResponse,
}

impl CacheRecord {
    fn matches(&self, region: &str, topic: &str) -> bool {
        self.country == region && self.topic == topic
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredCache {
    Many(Vec<CacheRecord>),
    Single(CacheRecord),
}

pub struct TrendCache {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl TrendCache {
    pub fn new(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the cached response for exactly this (region, topic), if any.
    pub async fn get(&self, region: &str, topic: &str) -> Option<TrendResponse> {
        self.load()
            .await
            .into_iter()
            .find(|record| record.matches(region, topic))
            .map(|record| record.data)
    }

    /// Stores `data` for (region, topic), replacing any previous entry for it.
    pub async fn put(&self, region: &str, topic: &str, data: &TrendResponse) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await;
        records.retain(|record| !record.matches(region, topic));
        records.insert(
            0,
            CacheRecord {
                country: region.to_string(),
                topic: topic.to_string(),
                data: data.clone(),
            },
        );
        records.truncate(self.capacity);

        let stored = if self.capacity == 1 {
            StoredCache::Single(records.remove(0))
        } else {
            StoredCache::Many(records)
        };
        let json = serde_json::to_string(&stored)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode trend cache: {}", e)))?;
        self.store.set(TRENDS_CACHE_KEY, &json).await?;
        debug!(region, topic, "Trend cache updated");
        Ok(())
    }

    /// Reads every cached record. Missing or unreadable data counts as empty.
    async fn load(&self) -> Vec<CacheRecord> {
        let raw = match self.store.get(TRENDS_CACHE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Trend cache unreadable, treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_str::<StoredCache>(&raw) {
            Ok(StoredCache::Many(records)) => records,
            Ok(StoredCache::Single(record)) => vec![record],
            Err(e) => {
                warn!(error = %e, "Trend cache corrupt, treating as empty");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use analista_core::domain::{Impact, Trend};
    use chrono::Utc;

    fn response(title: &str) -> TrendResponse {
        TrendResponse::fresh(
            vec![Trend {
                title: title.to_string(),
                category: "General".to_string(),
                impact: Impact::Medium,
            }],
            vec![],
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn single_slot_keeps_only_the_last_pair() {
        let store = Arc::new(MemoryStore::new());
        let cache = TrendCache::new(store.clone(), 1);

        cache.put("Global", "Todos", &response("a")).await.unwrap();
        cache.put("Chile", "Economía", &response("b")).await.unwrap();

        assert!(cache.get("Global", "Todos").await.is_none());
        assert_eq!(cache.get("Chile", "Economía").await.unwrap().trends[0].title, "b");

        let raw = store.get(TRENDS_CACHE_KEY).await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["country"], "Chile");
        assert_eq!(json["topic"], "Economía");
        assert!(json["data"]["trends"].is_array());
    }

    #[tokio::test]
    async fn lookups_require_an_exact_match() {
        let cache = TrendCache::new(Arc::new(MemoryStore::new()), 1);
        cache.put("Global", "Economy", &response("a")).await.unwrap();
        assert!(cache.get("Global", "economy").await.is_none());
        assert!(cache.get("global", "Economy").await.is_none());
        assert!(cache.get("Global", "Economy").await.is_some());
    }

    #[tokio::test]
    async fn larger_capacity_evicts_oldest_write() {
        let cache = TrendCache::new(Arc::new(MemoryStore::new()), 2);

        cache.put("Global", "A", &response("a")).await.unwrap();
        cache.put("Global", "B", &response("b")).await.unwrap();
        cache.put("Global", "A", &response("a2")).await.unwrap();
        cache.put("Global", "C", &response("c")).await.unwrap();

        assert_eq!(cache.get("Global", "A").await.unwrap().trends[0].title, "a2");
        assert!(cache.get("Global", "B").await.is_none());
        assert!(cache.get("Global", "C").await.is_some());
    }

    #[tokio::test]
    async fn reads_a_single_record_written_before_capacity_grew() {
        let store = Arc::new(MemoryStore::new());
        TrendCache::new(store.clone(), 1)
            .put("Global", "Todos", &response("old"))
            .await
            .unwrap();

        let cache = TrendCache::new(store, 5);
        assert_eq!(cache.get("Global", "Todos").await.unwrap().trends[0].title, "old");
    }

    #[tokio::test]
    async fn corrupt_cache_reads_as_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(TRENDS_CACHE_KEY, "{not json").await.unwrap();
        let cache = TrendCache::new(store, 1);

        assert!(cache.get("Global", "Todos").await.is_none());
        cache.put("Global", "Todos", &response("a")).await.unwrap();
        assert!(cache.get("Global", "Todos").await.is_some());
    }
}
