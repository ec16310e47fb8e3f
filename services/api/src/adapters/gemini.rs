//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for Google's Gemini API.
//! It implements the `GroundedModelService` port from the `core` crate, talking to
//! the REST endpoints directly with `reqwest`.
//!
//! - Auth is the `?key=` query parameter.
//! - Grounding is enabled with the `google_search` tool.
//! - Streaming uses `streamGenerateContent?alt=sse`.

use std::time::Duration;

use analista_core::ports::{
    GenerationRequest, GroundedModelService, GroundedText, GroundingChunk, PortError,
    PortResult, TextStream,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::adapters::credential::CredentialSlot;

const INVALID_KEY_MARKER: &str = "API key not valid";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GroundedModelService` using the Gemini REST API.
#[derive(Clone)]
pub struct GeminiAdapter {
    client: Client,
    base_url: String,
    model: String,
    credential: CredentialSlot,
    /// Whole-request limit for one-shot calls, and the longest silence
    /// tolerated between chunks of a stream.
    timeout: Duration,
}

impl GeminiAdapter {
    /// Creates a new `GeminiAdapter`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        credential: CredentialSlot,
        timeout: Duration,
    ) -> PortResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PortError::Unexpected(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            credential,
            timeout,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    fn api_key(&self) -> PortResult<String> {
        self.credential.current().ok_or(PortError::MissingCredential)
    }
}

/// Formats a transport error without its URL, which carries the API key.
fn transport_error(context: &str, e: reqwest::Error) -> PortError {
    PortError::Unexpected(format!("{}: {}", context, e.without_url()))
}

//=========================================================================================
// Request / Response Helpers
//=========================================================================================

/// Builds the JSON request body for a `generateContent` call.
fn build_request_body(request: &GenerationRequest) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt }],
        }],
    });

    if let Some(system) = &request.system_instruction {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }

    let mut generation_config = serde_json::Map::new();
    if let Some(temperature) = request.temperature {
        generation_config.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(top_p) = request.top_p {
        generation_config.insert("topP".to_string(), json!(top_p));
    }
    if !generation_config.is_empty() {
        body["generationConfig"] = Value::Object(generation_config);
    }

    if request.web_search {
        body["tools"] = json!([{ "google_search": {} }]);
    }

    body
}

/// Concatenates the text parts of the first candidate.
fn candidate_text(data: &Value) -> String {
    data["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn grounding_chunks(data: &Value) -> Vec<GroundingChunk> {
    data["candidates"][0]["groundingMetadata"]["groundingChunks"]
        .as_array()
        .map(|chunks| {
            chunks
                .iter()
                .map(|chunk| GroundingChunk {
                    title: chunk["web"]["title"].as_str().map(str::to_string),
                    uri: chunk["web"]["uri"].as_str().map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parses a full `generateContent` response.
fn parse_generate_response(data: &Value) -> PortResult<GroundedText> {
    if let Some(error) = data.get("error") {
        return Err(PortError::Unexpected(error_message(error)));
    }
    Ok(GroundedText {
        text: candidate_text(data),
        grounding_chunks: grounding_chunks(data),
    })
}

fn error_message(error: &Value) -> String {
    error["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

/// Maps a non-success HTTP status onto a `PortError`.
///
/// Gemini answers a bad key with 400 and an "API key not valid" message, so 400
/// is treated as a credential problem alongside 401/403.
fn map_http_error(status: StatusCode, body_text: &str) -> PortError {
    let message = serde_json::from_str::<Value>(body_text)
        .ok()
        .and_then(|v| v.get("error").map(error_message))
        .unwrap_or_else(|| body_text.to_string());

    match status.as_u16() {
        400 | 401 | 403 => PortError::InvalidCredential(message),
        429 => PortError::RateLimited(message),
        _ if message.contains(INVALID_KEY_MARKER) => PortError::InvalidCredential(message),
        _ => PortError::Unexpected(format!("HTTP {} from Gemini API: {}", status, message)),
    }
}

/// Splits a server-sent-events byte stream into `data:` payloads.
///
/// Buffers raw bytes so a multi-byte character split across network chunks is
/// only decoded once its line is complete.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feeds a chunk and returns every payload completed by it.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(data) = Self::data_of(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flushes a trailing payload that was not newline-terminated.
    fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        Self::data_of(&line)
    }

    fn data_of(line: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(line);
        let data = line.trim().strip_prefix("data:")?.trim();
        (!data.is_empty()).then(|| data.to_string())
    }
}

/// Extracts the text delta from one streamed event.
fn stream_event_text(payload: &str) -> PortResult<Option<String>> {
    let data: Value = match serde_json::from_str(payload) {
        Ok(data) => data,
        Err(e) => {
            warn!(error = %e, "Failed to parse Gemini SSE JSON chunk");
            return Ok(None);
        }
    };
    if let Some(error) = data.get("error") {
        return Err(PortError::Unexpected(error_message(error)));
    }
    let text = candidate_text(&data);
    Ok((!text.is_empty()).then_some(text))
}

//=========================================================================================
// `GroundedModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GroundedModelService for GeminiAdapter {
    fn has_credential(&self) -> bool {
        self.credential.is_selected()
    }

    async fn generate(&self, request: &GenerationRequest) -> PortResult<GroundedText> {
        let key = self.api_key()?;
        debug!(model = self.model.as_str(), "Sending Gemini generation request");

        let response = self
            .client
            .post(self.endpoint("generateContent"))
            .query(&[("key", key.as_str())])
            .timeout(self.timeout)
            .json(&build_request_body(request))
            .send()
            .await
            .map_err(|e| transport_error("Request to Gemini API failed", e))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| transport_error("Failed to read response body", e))?;

        if !status.is_success() {
            return Err(map_http_error(status, &body_text));
        }

        let data: Value = serde_json::from_str(&body_text)
            .map_err(|e| PortError::Malformed(format!("Invalid JSON in response: {}", e)))?;
        parse_generate_response(&data)
    }

    async fn generate_streaming(&self, request: &GenerationRequest) -> PortResult<TextStream> {
        let key = self.api_key()?;
        debug!(model = self.model.as_str(), "Sending Gemini streaming request");

        let pending = self
            .client
            .post(self.endpoint("streamGenerateContent"))
            .query(&[("alt", "sse"), ("key", key.as_str())])
            .json(&build_request_body(request))
            .send();
        let response = tokio::time::timeout(self.timeout, pending)
            .await
            .map_err(|_| PortError::Unexpected("Gemini stream did not start in time".to_string()))?
            .map_err(|e| transport_error("Streaming request to Gemini API failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body_text));
        }

        let mut bytes = response.bytes_stream();
        let idle_limit = self.timeout;
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::default();
            loop {
                let chunk = match tokio::time::timeout(idle_limit, bytes.next()).await {
                    Ok(Some(Ok(chunk))) => chunk,
                    Ok(None) => break,
                    Ok(Some(Err(e))) => {
                        yield Err(transport_error("Failed to read streaming chunk", e));
                        return;
                    }
                    Err(_) => {
                        yield Err(PortError::Unexpected(format!(
                            "Gemini stream stalled for more than {}s",
                            idle_limit.as_secs()
                        )));
                        return;
                    }
                };
                for payload in decoder.push(&chunk) {
                    match stream_event_text(&payload) {
                        Ok(Some(text)) => yield Ok(text),
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
            if let Some(payload) = decoder.finish() {
                match stream_event_text(&payload) {
                    Ok(Some(text)) => yield Ok(text),
                    Ok(None) => {}
                    Err(e) => yield Err(e),
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
