//! services/api/src/adapters/stats_db.rs
//!
//! This module contains the database adapter for usage statistics, the concrete
//! implementation of the `UsageStatsService` port. Only anonymized figures are
//! written here; analysis bodies never leave the local store.

use analista_core::domain::GenerationStats;
use analista_core::ports::{PortError, PortResult, UsageStatsService};
use async_trait::async_trait;
use sqlx::PgPool;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `UsageStatsService` port.
#[derive(Clone)]
pub struct PgStatsAdapter {
    pool: PgPool,
}

impl PgStatsAdapter {
    /// Creates a new `PgStatsAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// `UsageStatsService` Trait Implementation
//=========================================================================================

#[async_trait]
impl UsageStatsService for PgStatsAdapter {
    async fn record_generation(&self, stats: &GenerationStats) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO generation_stats \
             (analysis_id, user_id, topic, analysis_type, char_count, title_snippet, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(stats.analysis_id)
        .bind(stats.user_id.as_deref())
        .bind(stats.topic.as_str())
        .bind(stats.analysis_type.as_str())
        .bind(i64::try_from(stats.char_count).unwrap_or(i64::MAX))
        .bind(&stats.title_snippet)
        .bind(stats.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
