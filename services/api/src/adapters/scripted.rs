//! services/api/src/adapters/scripted.rs
//!
//! A `GroundedModelService` that replays canned answers, for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use analista_core::ports::{
    GenerationRequest, GroundedModelService, GroundedText, GroundingChunk, PortError,
    PortResult, TextStream,
};
use async_trait::async_trait;
use tokio::time::Instant;

#[derive(Default)]
pub struct ScriptedModel {
    credential: bool,
    answers: Mutex<VecDeque<PortResult<GroundedText>>>,
    stream: Mutex<Option<Vec<PortResult<String>>>>,
    calls: Mutex<Vec<(Instant, GenerationRequest)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            credential: true,
            ..Default::default()
        }
    }

    pub fn without_credential() -> Self {
        Self::default()
    }

    pub fn answer(self, text: &str, chunks: &[(&str, &str)]) -> Self {
        let grounded = GroundedText {
            text: text.to_string(),
            grounding_chunks: chunks
                .iter()
                .map(|(title, uri)| GroundingChunk {
                    title: Some(title.to_string()),
                    uri: Some(uri.to_string()),
                })
                .collect(),
        };
        self.push(Ok(grounded))
    }

    pub fn fail(self, error: PortError) -> Self {
        self.push(Err(error))
    }

    fn push(self, answer: PortResult<GroundedText>) -> Self {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push_back(answer);
        }
        self
    }

    pub fn stream(self, chunks: Vec<PortResult<String>>) -> Self {
        if let Ok(mut stream) = self.stream.lock() {
            *stream = Some(chunks);
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .map(|c| c.iter().map(|(at, _)| *at).collect())
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.calls
            .lock()
            .map(|c| c.iter().map(|(_, r)| r.clone()).collect())
            .unwrap_or_default()
    }

    fn record(&self, request: &GenerationRequest) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((Instant::now(), request.clone()));
        }
    }
}

#[async_trait]
impl GroundedModelService for ScriptedModel {
    fn has_credential(&self) -> bool {
        self.credential
    }

    async fn generate(&self, request: &GenerationRequest) -> PortResult<GroundedText> {
        self.record(request);
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or_else(|| Err(PortError::Unexpected("no scripted answer left".to_string())))
    }

    async fn generate_streaming(&self, request: &GenerationRequest) -> PortResult<TextStream> {
        self.record(request);
        if !self.credential {
            return Err(PortError::MissingCredential);
        }
        let chunks = self
            .stream
            .lock()
            .ok()
            .and_then(|mut stream| stream.take())
            .ok_or_else(|| PortError::Unexpected("no scripted stream".to_string()))?;
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}
