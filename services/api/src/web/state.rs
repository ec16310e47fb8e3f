//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use analista_core::ports::{GroundedModelService, KeyValueStore, UsageStatsService};

use crate::adapters::CredentialSlot;
use crate::config::TrendsConfig;
use crate::services::{
    AnalysisService, LibraryService, RetryPolicy, SettingsContext, TrendCache, TrendService,
};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub credential: CredentialSlot,
    pub trends: Arc<TrendService>,
    pub analysis: Arc<AnalysisService>,
    pub library: Arc<LibraryService>,
    pub settings: Arc<SettingsContext>,
}

impl AppState {
    /// Wires the services on top of the given adapters. Settings are read from
    /// the store here, once.
    pub async fn new(
        model: Arc<dyn GroundedModelService>,
        credential: CredentialSlot,
        store: Arc<dyn KeyValueStore>,
        stats: Option<Arc<dyn UsageStatsService>>,
        trends_config: &TrendsConfig,
    ) -> Self {
        let cache = TrendCache::new(store.clone(), trends_config.cache_capacity);
        Self {
            credential,
            trends: Arc::new(TrendService::new(
                model.clone(),
                cache,
                RetryPolicy::from(trends_config),
            )),
            analysis: Arc::new(AnalysisService::new(model)),
            library: Arc::new(LibraryService::new(store.clone(), stats)),
            settings: Arc::new(SettingsContext::load(store).await),
        }
    }
}
