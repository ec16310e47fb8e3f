//! services/api/src/services/trends.rs
//!
//! The dashboard's trend fetch: cache lookup, one grounded model call, parsing,
//! citation cleanup, and the retry policy for rate limits.
//!
//! `fetch_trends` never fails. Every outcome, including errors, is a
//! `TrendResponse` the dashboard can render.

use std::sync::Arc;
use std::time::Duration;

use analista_core::domain::TrendResponse;
use analista_core::ports::{GenerationRequest, GroundedModelService, PortError, PortResult};
use analista_core::trends::{collect_sources, parse_trend_lines};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::TrendsConfig;
use crate::services::prompts::trend_prompt;
use crate::services::trend_cache::TrendCache;

pub const NO_CREDENTIAL_MESSAGE: &str =
    "No valid API key was detected. Please select a key in the panel.";
pub const INVALID_CREDENTIAL_MESSAGE: &str =
    "The API key is not valid. Please link your account again.";
pub const FETCH_FAILED_MESSAGE: &str =
    "We could not fetch the trends. Check your connection or API key.";

/// How many times a rate-limited fetch is retried, and how long to wait first.
/// Each further wait doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub initial_backoff: Duration,
}

impl From<&TrendsConfig> for RetryPolicy {
    fn from(config: &TrendsConfig) -> Self {
        Self {
            retries: config.retries,
            initial_backoff: config.initial_backoff,
        }
    }
}

pub struct TrendService {
    model: Arc<dyn GroundedModelService>,
    cache: TrendCache,
    retry: RetryPolicy,
}

impl TrendService {
    pub fn new(model: Arc<dyn GroundedModelService>, cache: TrendCache, retry: RetryPolicy) -> Self {
        Self {
            model,
            cache,
            retry,
        }
    }

    /// Returns the trends for (region, topic), from the cache unless
    /// `force_refresh` is set.
    pub async fn fetch_trends(&self, region: &str, topic: &str, force_refresh: bool) -> TrendResponse {
        if !force_refresh {
            if let Some(cached) = self.cache.get(region, topic).await {
                info!(region, topic, "Serving trends from cache");
                return cached;
            }
        }

        if !self.model.has_credential() {
            return TrendResponse::needs_key(NO_CREDENTIAL_MESSAGE);
        }

        let mut retries_left = self.retry.retries;
        let mut backoff = self.retry.initial_backoff;
        loop {
            match self.fetch_once(region, topic).await {
                Ok(response) => return response,
                Err(PortError::InvalidCredential(message)) => {
                    warn!(region, topic, %message, "Trend fetch rejected the API key");
                    return TrendResponse::needs_key(INVALID_CREDENTIAL_MESSAGE);
                }
                Err(PortError::MissingCredential) => {
                    return TrendResponse::needs_key(NO_CREDENTIAL_MESSAGE);
                }
                Err(PortError::RateLimited(message)) if retries_left > 0 => {
                    warn!(
                        region,
                        topic,
                        %message,
                        retries_left,
                        backoff_ms = backoff.as_millis() as u64,
                        "Trend fetch rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    retries_left -= 1;
                    backoff *= 2;
                }
                Err(e) => {
                    error!(region, topic, error = %e, "Trend fetch failed");
                    return TrendResponse::failure(FETCH_FAILED_MESSAGE);
                }
            }
        }
    }

    async fn fetch_once(&self, region: &str, topic: &str) -> PortResult<TrendResponse> {
        let request = GenerationRequest {
            prompt: trend_prompt(region, topic),
            web_search: true,
            ..Default::default()
        };
        let grounded = self.model.generate(&request).await?;

        let trends = parse_trend_lines(&grounded.text)?;
        let sources = collect_sources(&grounded.grounding_chunks, trends.len());
        let response = TrendResponse::fresh(trends, sources, Utc::now());

        if let Err(e) = self.cache.put(region, topic, &response).await {
            warn!(region, topic, error = %e, "Could not persist trends to the cache");
        }
        info!(
            region,
            topic,
            trends = response.trends.len(),
            sources = response.sources.len(),
            "Fetched fresh trends"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scripted::ScriptedModel;
    use crate::adapters::MemoryStore;
    use crate::services::trend_cache::TRENDS_CACHE_KEY;
    use analista_core::domain::Impact;
    use analista_core::ports::KeyValueStore;

    const WELL_FORMED: &str =
        "Economy | Oil prices surge | Alto\nTech | AI regulation | Medio\nSports | World Cup draw | Bajo";

    fn service(model: ScriptedModel) -> (TrendService, Arc<ScriptedModel>, Arc<MemoryStore>) {
        let model = Arc::new(model);
        let store = Arc::new(MemoryStore::new());
        let service = TrendService::new(
            model.clone(),
            TrendCache::new(store.clone(), 1),
            RetryPolicy {
                retries: 2,
                initial_backoff: Duration::from_millis(2000),
            },
        );
        (service, model, store)
    }

    fn rate_limited() -> PortError {
        PortError::RateLimited("Resource has been exhausted".to_string())
    }

    #[tokio::test]
    async fn global_economy_end_to_end() {
        let (service, model, store) = service(ScriptedModel::new().answer(
            WELL_FORMED,
            &[
                ("Reuters", "https://reuters.com/oil"),
                ("Reuters", "https://reuters.com/oil"),
            ],
        ));

        let response = service.fetch_trends("Global", "Economy", false).await;

        assert!(response.is_success());
        let impacts: Vec<_> = response.trends.iter().map(|t| t.impact).collect();
        assert_eq!(impacts, vec![Impact::High, Impact::Medium, Impact::Low]);
        assert!(response.sources.len() <= 2);
        assert_eq!(response.sources.len(), 1);
        assert!(response.last_updated.is_some());

        let request = &model.requests()[0];
        assert!(request.web_search);
        assert!(request.prompt.contains("en el mundo"));

        let raw = store.get(TRENDS_CACHE_KEY).await.unwrap().unwrap();
        let cached: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(cached["country"], "Global");
        assert_eq!(cached["topic"], "Economy");
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let (service, model, _) = service(ScriptedModel::new().answer(WELL_FORMED, &[]));

        let first = service.fetch_trends("Chile", "Política", false).await;
        let second = service.fetch_trends("Chile", "Política", false).await;

        assert_eq!(first, second);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_the_cache() {
        let (service, model, _) = service(
            ScriptedModel::new()
                .answer("A | first | Alto", &[])
                .answer("B | second | Bajo", &[]),
        );

        service.fetch_trends("Global", "Todos", false).await;
        let refreshed = service.fetch_trends("Global", "Todos", true).await;

        assert_eq!(model.call_count(), 2);
        assert_eq!(refreshed.trends[0].title, "second");
        let cached = service.fetch_trends("Global", "Todos", false).await;
        assert_eq!(cached.trends[0].title, "second");
    }

    #[tokio::test]
    async fn missing_credential_skips_the_network() {
        let (service, model, _) = service(ScriptedModel::without_credential());

        let response = service.fetch_trends("Global", "Todos", false).await;

        assert!(response.needs_key_selection);
        assert!(response.trends.is_empty());
        assert!(response.error.is_some());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn rejected_key_is_not_retried() {
        let (service, model, _) = service(
            ScriptedModel::new().fail(PortError::InvalidCredential("API key not valid".to_string())),
        );

        let response = service.fetch_trends("Global", "Todos", true).await;

        assert!(response.needs_key_selection);
        assert_eq!(response.error.as_deref(), Some(INVALID_CREDENTIAL_MESSAGE));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn unparseable_answer_is_a_generic_failure() {
        let (service, _, store) =
            service(ScriptedModel::new().answer("Sorry, nothing notable today.", &[]));

        let response = service.fetch_trends("Global", "Todos", false).await;

        assert!(!response.needs_key_selection);
        assert_eq!(response.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert!(response.trends.is_empty());
        assert!(store.get(TRENDS_CACHE_KEY).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limits_back_off_exponentially_then_give_up() {
        let (service, model, _) = service(
            ScriptedModel::new()
                .fail(rate_limited())
                .fail(rate_limited())
                .fail(rate_limited()),
        );

        let response = service.fetch_trends("Global", "Todos", false).await;

        assert_eq!(response.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert!(!response.needs_key_selection);
        assert_eq!(model.call_count(), 3);

        let times = model.call_times();
        let first_wait = times[1] - times[0];
        let second_wait = times[2] - times[1];
        assert!(first_wait >= Duration::from_millis(2000));
        assert!(second_wait >= first_wait * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_recovers_on_retry() {
        let (service, model, _) = service(
            ScriptedModel::new()
                .fail(rate_limited())
                .answer(WELL_FORMED, &[]),
        );

        let response = service.fetch_trends("Global", "Todos", false).await;

        assert!(response.is_success());
        assert_eq!(response.trends.len(), 3);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn other_failures_are_generic() {
        let (service, model, _) = service(
            ScriptedModel::new().fail(PortError::Unexpected("connection reset".to_string())),
        );

        let response = service.fetch_trends("Global", "Todos", false).await;

        assert_eq!(response.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert!(response.sources.is_empty());
        assert_eq!(model.call_count(), 1);
    }
}
