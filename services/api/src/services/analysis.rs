//! services/api/src/services/analysis.rs
//!
//! Streams a generated analysis. The model yields deltas; callers always
//! receive the full text generated so far, so a client can simply replace what
//! it displays on every update.

use std::sync::Arc;

use analista_core::domain::{AnalysisType, Topic};
use analista_core::ports::{GenerationRequest, GroundedModelService, PortError, PortResult};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::services::prompts::{analysis_system_instruction, analysis_user_prompt};

const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.9;

/// What the generator asks for.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnalysisRequest {
    pub topic: Topic,
    pub format: AnalysisType,
    pub prompt: String,
}

/// Owns the text generated so far and hands out snapshots of it.
#[derive(Debug, Default)]
pub struct TextAccumulator {
    buffer: String,
}

impl TextAccumulator {
    /// Appends a delta and returns a copy of the whole text.
    pub fn push(&mut self, delta: &str) -> String {
        self.buffer.push_str(delta);
        self.buffer.clone()
    }

    pub fn into_text(self) -> String {
        self.buffer
    }
}

pub struct AnalysisService {
    model: Arc<dyn GroundedModelService>,
}

impl AnalysisService {
    pub fn new(model: Arc<dyn GroundedModelService>) -> Self {
        Self { model }
    }

    /// Validates the request and builds the model call. Fails on an empty
    /// prompt or a missing credential, so callers can reject a request before
    /// committing to a stream.
    pub fn prepare(&self, request: &AnalysisRequest) -> PortResult<GenerationRequest> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(PortError::InvalidInput("the prompt must not be empty".to_string()));
        }
        if !self.model.has_credential() {
            return Err(PortError::MissingCredential);
        }
        Ok(GenerationRequest {
            prompt: analysis_user_prompt(prompt),
            system_instruction: Some(analysis_system_instruction(
                request.topic,
                request.format,
                prompt,
            )),
            temperature: Some(TEMPERATURE),
            top_p: Some(TOP_P),
            web_search: true,
        })
    }

    /// Runs a full generation, handing `sink` the accumulated text after every
    /// non-empty delta, and returns the final text.
    ///
    /// A failure at any point is returned as-is; whatever the sink already
    /// received is not a result.
    pub async fn stream_analysis<F>(&self, request: &AnalysisRequest, mut sink: F) -> PortResult<String>
    where
        F: FnMut(String),
    {
        let generation = self.prepare(request)?;
        info!(
            topic = request.topic.as_str(),
            format = request.format.as_str(),
            "Starting analysis stream"
        );

        let mut deltas = self.model.generate_streaming(&generation).await?;
        let mut accumulator = TextAccumulator::default();
        while let Some(delta) = deltas.next().await {
            let delta = delta.map_err(|e| {
                error!(error = %e, "Analysis stream failed");
                e
            })?;
            if !delta.is_empty() {
                sink(accumulator.push(&delta));
            }
        }
        Ok(accumulator.into_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scripted::ScriptedModel;

    fn request(prompt: &str) -> AnalysisRequest {
        AnalysisRequest {
            topic: Topic::Economy,
            format: AnalysisType::Brief,
            prompt: prompt.to_string(),
        }
    }

    #[test]
    fn accumulator_returns_full_text() {
        let mut acc = TextAccumulator::default();
        assert_eq!(acc.push("Hola"), "Hola");
        assert_eq!(acc.push(", mundo"), "Hola, mundo");
        assert_eq!(acc.into_text(), "Hola, mundo");
    }

    #[tokio::test]
    async fn sink_receives_accumulated_text() {
        let model = Arc::new(ScriptedModel::new().stream(vec![
            Ok("# Petróleo".to_string()),
            Ok(String::new()),
            Ok("\n\nSube el barril.".to_string()),
        ]));
        let service = AnalysisService::new(model.clone());

        let mut seen = Vec::new();
        let text = service
            .stream_analysis(&request("precio del petróleo"), |s| seen.push(s))
            .await
            .unwrap();

        assert_eq!(seen, vec!["# Petróleo", "# Petróleo\n\nSube el barril."]);
        assert_eq!(text, "# Petróleo\n\nSube el barril.");

        let sent = &model.requests()[0];
        assert!(sent.web_search);
        assert_eq!(sent.temperature, Some(TEMPERATURE));
        assert!(sent.prompt.contains("precio del petróleo"));
        assert!(sent.system_instruction.as_deref().unwrap().contains("BRIEF"));
    }

    #[tokio::test]
    async fn mid_stream_failure_is_propagated() {
        let model = Arc::new(ScriptedModel::new().stream(vec![
            Ok("partial".to_string()),
            Err(PortError::Unexpected("stream reset".to_string())),
            Ok("never delivered".to_string()),
        ]));
        let service = AnalysisService::new(model);

        let mut seen = Vec::new();
        let err = service
            .stream_analysis(&request("x"), |s| seen.push(s))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "An unexpected error occurred: stream reset");
        assert_eq!(seen, vec!["partial"]);
    }

    #[tokio::test]
    async fn missing_credential_is_fatal() {
        let model = Arc::new(ScriptedModel::without_credential());
        let service = AnalysisService::new(model.clone());

        let err = service.stream_analysis(&request("x"), |_| {}).await.unwrap_err();
        assert!(matches!(err, PortError::MissingCredential));
        assert_eq!(model.call_count(), 0);
    }

    #[test]
    fn prepare_checks_before_any_call() {
        let service = AnalysisService::new(Arc::new(ScriptedModel::without_credential()));
        assert!(matches!(
            service.prepare(&request("   ")),
            Err(PortError::InvalidInput(_))
        ));
        assert!(matches!(
            service.prepare(&request("bolsa")),
            Err(PortError::MissingCredential)
        ));

        let service = AnalysisService::new(Arc::new(ScriptedModel::new()));
        let generation = service.prepare(&request("  bolsa ")).unwrap();
        assert_eq!(generation.top_p, Some(TOP_P));
        assert!(generation.prompt.ends_with("bolsa"));
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected() {
        let model = Arc::new(ScriptedModel::new());
        let service = AnalysisService::new(model.clone());

        let err = service.stream_analysis(&request("   "), |_| {}).await.unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
        assert_eq!(model.call_count(), 0);
    }
}
