//! services/api/src/services/library.rs
//!
//! The user's library of saved analyses, most recent first.
//!
//! Full content only ever lives in the local key/value store. When a statistics
//! backend is configured, each save also mirrors anonymized figures to it in a
//! detached task whose failure never affects the save.

use std::sync::Arc;

use analista_core::domain::{AnalysisResult, GenerationStats, NewAnalysis};
use analista_core::ports::{KeyValueStore, PortError, PortResult, UsageStatsService};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const LIBRARY_KEY_PREFIX: &str = "analista_plus_library";

/// The storage key for a user's library; anonymous use shares one library.
pub fn library_key(user_id: Option<&str>) -> String {
    match user_id {
        Some(uid) => format!("{}_{}", LIBRARY_KEY_PREFIX, uid),
        None => LIBRARY_KEY_PREFIX.to_string(),
    }
}

pub struct LibraryService {
    store: Arc<dyn KeyValueStore>,
    stats: Option<Arc<dyn UsageStatsService>>,
    write_lock: Mutex<()>,
}

impl LibraryService {
    pub fn new(store: Arc<dyn KeyValueStore>, stats: Option<Arc<dyn UsageStatsService>>) -> Self {
        Self {
            store,
            stats,
            write_lock: Mutex::new(()),
        }
    }

    /// Saves a new analysis at the front of the library and returns it with its
    /// assigned id and timestamp. Fails without writing when the stored list
    /// cannot be read.
    pub async fn save(&self, user_id: Option<&str>, analysis: NewAnalysis) -> PortResult<AnalysisResult> {
        let saved = analysis.into_result(Uuid::new_v4(), Utc::now());
        {
            let _guard = self.write_lock.lock().await;
            let key = library_key(user_id);
            let mut library = self.read_strict(&key).await?;
            library.insert(0, saved.clone());
            self.write(&key, &library).await?;
        }
        info!(analysis_id = %saved.id, "Analysis saved to the local library");

        if let Some(stats) = &self.stats {
            let stats = Arc::clone(stats);
            let record = GenerationStats::from_analysis(user_id, &saved);
            tokio::spawn(async move {
                if let Err(e) = stats.record_generation(&record).await {
                    warn!(
                        analysis_id = %record.analysis_id,
                        error = %e,
                        "Could not mirror usage statistics; the analysis is saved locally"
                    );
                }
            });
        }

        Ok(saved)
    }

    /// Lists the library, newest first. Missing or unreadable data is empty.
    pub async fn list(&self, user_id: Option<&str>) -> Vec<AnalysisResult> {
        self.read(&library_key(user_id)).await
    }

    pub async fn get(&self, user_id: Option<&str>, id: Uuid) -> Option<AnalysisResult> {
        self.list(user_id).await.into_iter().find(|a| a.id == id)
    }

    /// Removes the analysis with `id`. Unknown ids are ignored.
    pub async fn remove(&self, user_id: Option<&str>, id: Uuid) -> PortResult<()> {
        let _guard = self.write_lock.lock().await;
        let key = library_key(user_id);
        let mut library = self.read_strict(&key).await?;
        let before = library.len();
        library.retain(|a| a.id != id);
        if library.len() == before {
            return Ok(());
        }
        self.write(&key, &library).await?;
        info!(analysis_id = %id, "Analysis removed from the local library");
        Ok(())
    }

    /// Lenient read for display: anything unreadable lists as empty.
    async fn read(&self, key: &str) -> Vec<AnalysisResult> {
        self.read_strict(key).await.unwrap_or_else(|e| {
            error!(key, error = %e, "Local library unreadable, listing it as empty");
            Vec::new()
        })
    }

    /// Read before a rewrite. An unreadable list is an error so that a write
    /// never replaces entries it could not see.
    async fn read_strict(&self, key: &str) -> PortResult<Vec<AnalysisResult>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw)
            .map_err(|e| PortError::Unexpected(format!("Local library '{}' is corrupt: {}", key, e)))
    }

    async fn write(&self, key: &str, library: &[AnalysisResult]) -> PortResult<()> {
        let json = serde_json::to_string(library)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode library: {}", e)))?;
        self.store.set(key, &json).await
    }
}
