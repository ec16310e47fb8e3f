//! crates/analista_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary between the services and the concrete
//! adapters (Gemini over HTTP, the on-disk key/value store, PostgreSQL).

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::GenerationStats;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, disk).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No API key has been selected")]
    MissingCredential,
    #[error("The API key was rejected: {0}")]
    InvalidCredential(String),
    #[error("Rate limited by the model provider: {0}")]
    RateLimited(String),
    #[error("Unrecognised model output: {0}")]
    Malformed(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Model Request / Response Types
//=========================================================================================

/// A single generation request sent to a grounded model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    /// Attach the web search tool so the answer is grounded in live results.
    pub web_search: bool,
}

/// One web chunk from the model's grounding metadata. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundingChunk {
    pub title: Option<String>,
    pub uri: Option<String>,
}

/// The text of a one-shot generation plus the web pages it was grounded on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundedText {
    pub text: String,
    pub grounding_chunks: Vec<GroundingChunk>,
}

/// A stream of incremental text fragments (deltas, not accumulated text).
pub type TextStream = Pin<Box<dyn Stream<Item = PortResult<String>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait GroundedModelService: Send + Sync {
    /// Whether a usable API credential is currently selected.
    fn has_credential(&self) -> bool;

    /// Runs a one-shot generation.
    async fn generate(&self, request: &GenerationRequest) -> PortResult<GroundedText>;

    /// Runs a streaming generation, yielding text deltas as they arrive.
    async fn generate_streaming(&self, request: &GenerationRequest) -> PortResult<TextStream>;
}

/// Persistent string storage addressed by key, in the manner of browser LocalStorage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> PortResult<()>;
    async fn remove(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait UsageStatsService: Send + Sync {
    /// Records the anonymized figures of one saved analysis.
    async fn record_generation(&self, stats: &GenerationStats) -> PortResult<()>;
}
