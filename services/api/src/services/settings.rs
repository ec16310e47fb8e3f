//! services/api/src/services/settings.rs
//!
//! The settings context: loaded once at startup, shared through the app state,
//! and changed only through `update`.

use std::sync::Arc;

use analista_core::domain::UserSettings;
use analista_core::ports::{KeyValueStore, PortError, PortResult};
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const SETTINGS_KEY: &str = "analista_plus_user_settings";

pub struct SettingsContext {
    store: Arc<dyn KeyValueStore>,
    current: RwLock<UserSettings>,
}

impl SettingsContext {
    /// Reads the stored settings, falling back to defaults when they are
    /// missing or unreadable.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let settings = match store.get(SETTINGS_KEY).await {
            Ok(Some(raw)) => serde_json::from_str::<UserSettings>(&raw)
                .map(UserSettings::normalized)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Stored settings are corrupt, using defaults");
                    UserSettings::default()
                }),
            Ok(None) => UserSettings::default(),
            Err(e) => {
                warn!(error = %e, "Could not read settings, using defaults");
                UserSettings::default()
            }
        };
        Self {
            store,
            current: RwLock::new(settings),
        }
    }

    pub async fn get(&self) -> UserSettings {
        self.current.read().await.clone()
    }

    /// Replaces the settings wholesale. The new value is persisted before it
    /// becomes visible, so a failed write leaves the old settings in place.
    pub async fn update(&self, settings: UserSettings) -> PortResult<UserSettings> {
        let settings = settings.normalized();
        let mut current = self.current.write().await;

        let json = serde_json::to_string(&settings)
            .map_err(|e| PortError::Unexpected(format!("Failed to encode settings: {}", e)))?;
        self.store.set(SETTINGS_KEY, &json).await?;

        *current = settings.clone();
        info!("User settings updated");
        Ok(settings)
    }
}
