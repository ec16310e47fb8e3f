//! crates/analista_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Field names serialize in camelCase because these records are persisted as-is
//! in the key/value store and returned unchanged to the browser client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::teleprompter::clamp_speed;

//=========================================================================================
// Trends
//=========================================================================================

/// How strongly a trend is expected to drive the news cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl Impact {
    /// Maps a model-provided impact label onto an `Impact`.
    ///
    /// The model answers in Spanish (`Alto`, `Medio`, `Bajo`) but English labels
    /// are accepted too. Anything unrecognised falls back to `Medium`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "alto" | "alta" | "high" => Impact::High,
            "bajo" | "baja" | "low" => Impact::Low,
            _ => Impact::Medium,
        }
    }
}

/// A single newsworthy item surfaced on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Trend {
    pub title: String,
    pub category: String,
    pub impact: Impact,
}

/// A web page the model grounded its answer on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SourceCitation {
    pub title: String,
    pub uri: String,
}

/// The outcome of a trend fetch. Failures are carried in `error` rather than
/// returned as an `Err`, so the dashboard can always render something.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrendResponse {
    pub trends: Vec<Trend>,
    pub sources: Vec<SourceCitation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub needs_key_selection: bool,
}

impl TrendResponse {
    /// A successful fetch, stamped with the time it completed.
    pub fn fresh(trends: Vec<Trend>, sources: Vec<SourceCitation>, now: DateTime<Utc>) -> Self {
        Self {
            trends,
            sources,
            last_updated: Some(now),
            error: None,
            needs_key_selection: false,
        }
    }

    /// A failure the user can only fix by selecting a (different) API key.
    pub fn needs_key(message: impl Into<String>) -> Self {
        Self {
            trends: Vec::new(),
            sources: Vec::new(),
            last_updated: None,
            error: Some(message.into()),
            needs_key_selection: true,
        }
    }

    /// A generic failure; the dashboard offers a retry.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            trends: Vec::new(),
            sources: Vec::new(),
            last_updated: None,
            error: Some(message.into()),
            needs_key_selection: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

//=========================================================================================
// Analyses
//=========================================================================================

/// The writing format requested from the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisType {
    Deep,
    Brief,
    Script,
    Anecdote,
    BookRef,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Deep => "DEEP",
            AnalysisType::Brief => "BRIEF",
            AnalysisType::Script => "SCRIPT",
            AnalysisType::Anecdote => "ANECDOTE",
            AnalysisType::BookRef => "BOOK_REF",
        }
    }
}

/// The news desk an analysis belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Topic {
    Politics,
    Economy,
    Geopolitics,
    Sports,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Politics => "POLITICS",
            Topic::Economy => "ECONOMY",
            Topic::Geopolitics => "GEOPOLITICS",
            Topic::Sports => "SPORTS",
        }
    }
}

/// An analysis the user saved to their library. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub topic: Topic,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An analysis as submitted by the generator, before it is assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalysis {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub topic: Topic,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewAnalysis {
    pub fn into_result(self, id: Uuid, created_at: DateTime<Utc>) -> AnalysisResult {
        AnalysisResult {
            id,
            title: self.title,
            content: self.content,
            analysis_type: self.analysis_type,
            topic: self.topic,
            created_at,
            tags: self.tags,
        }
    }
}

/// Anonymized usage figures mirrored to the remote store. Holds no body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    pub user_id: Option<String>,
    pub analysis_id: Uuid,
    pub topic: Topic,
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub char_count: usize,
    pub title_snippet: String,
    pub created_at: DateTime<Utc>,
}

impl GenerationStats {
    const TITLE_SNIPPET_CHARS: usize = 30;

    pub fn from_analysis(user_id: Option<&str>, analysis: &AnalysisResult) -> Self {
        Self {
            user_id: user_id.map(str::to_string),
            analysis_id: analysis.id,
            topic: analysis.topic,
            analysis_type: analysis.analysis_type,
            char_count: analysis.content.chars().count(),
            title_snippet: analysis
                .title
                .chars()
                .take(Self::TITLE_SNIPPET_CHARS)
                .collect(),
            created_at: analysis.created_at,
        }
    }
}

//=========================================================================================
// Settings
//=========================================================================================

/// Per-profile preferences. One record, overwritten wholesale on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub auto_refresh_news: bool,
    pub default_region: String,
    pub default_topic: String,
    #[serde(deserialize_with = "deserialize_speed")]
    #[schema(minimum = 1, maximum = 50)]
    pub teleprompter_base_speed: u8,
}

/// Accepts any integer speed and clamps it, so an out-of-range value never
/// discards the rest of the record.
fn deserialize_speed<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    i64::deserialize(deserializer).map(clamp_speed)
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            auto_refresh_news: false,
            default_region: "Global".to_string(),
            default_topic: "Todos".to_string(),
            teleprompter_base_speed: 10,
        }
    }
}

impl UserSettings {
    /// Returns the settings with the teleprompter speed pulled into range.
    pub fn normalized(mut self) -> Self {
        self.teleprompter_base_speed = clamp_speed(i64::from(self.teleprompter_base_speed));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_labels_map_in_both_languages() {
        assert_eq!(Impact::from_label("Alto"), Impact::High);
        assert_eq!(Impact::from_label(" medio "), Impact::Medium);
        assert_eq!(Impact::from_label("BAJO"), Impact::Low);
        assert_eq!(Impact::from_label("High"), Impact::High);
        assert_eq!(Impact::from_label("low"), Impact::Low);
        assert_eq!(Impact::from_label("crítico"), Impact::Medium);
        assert_eq!(Impact::from_label(""), Impact::Medium);
    }

    #[test]
    fn trend_response_omits_absent_fields() {
        let json = serde_json::to_value(TrendResponse::failure("offline")).unwrap();
        assert_eq!(json["error"], "offline");
        assert!(json.get("needsKeySelection").is_none());
        assert!(json.get("lastUpdated").is_none());

        let json = serde_json::to_value(TrendResponse::needs_key("pick a key")).unwrap();
        assert_eq!(json["needsKeySelection"], true);
    }

    #[test]
    fn analysis_result_uses_client_field_names() {
        let analysis = NewAnalysis {
            title: "Oil".to_string(),
            content: "Body".to_string(),
            analysis_type: AnalysisType::BookRef,
            topic: Topic::Economy,
            tags: vec![],
        }
        .into_result(Uuid::nil(), Utc::now());

        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["type"], "BOOK_REF");
        assert_eq!(json["topic"], "ECONOMY");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn stats_never_carry_the_body() {
        let analysis = NewAnalysis {
            title: "A very long title that goes well past thirty characters".to_string(),
            content: "secret body".to_string(),
            analysis_type: AnalysisType::Brief,
            topic: Topic::Politics,
            tags: vec![],
        }
        .into_result(Uuid::new_v4(), Utc::now());

        let stats = GenerationStats::from_analysis(Some("uid-1"), &analysis);
        assert_eq!(stats.char_count, 11);
        assert_eq!(stats.title_snippet.chars().count(), 30);

        let json = serde_json::to_string(&stats).unwrap();
        assert!(!json.contains("secret body"));
    }

    #[test]
    fn settings_fill_missing_fields_and_clamp_speed() {
        let settings: UserSettings =
            serde_json::from_str(r#"{"defaultRegion":"Chile","teleprompterBaseSpeed":200}"#)
                .unwrap();
        let settings = settings.normalized();
        assert_eq!(settings.default_region, "Chile");
        assert_eq!(settings.default_topic, "Todos");
        assert_eq!(settings.teleprompter_base_speed, 50);
    }

    #[test]
    fn speeds_outside_a_byte_are_clamped_not_rejected() {
        let high: UserSettings =
            serde_json::from_str(r#"{"defaultRegion":"Perú","teleprompterBaseSpeed":300}"#).unwrap();
        assert_eq!(high.teleprompter_base_speed, 50);
        assert_eq!(high.default_region, "Perú");

        let low: UserSettings = serde_json::from_str(r#"{"teleprompterBaseSpeed":-5}"#).unwrap();
        assert_eq!(low.teleprompter_base_speed, 1);

        assert!(serde_json::from_str::<UserSettings>(r#"{"teleprompterBaseSpeed":"fast"}"#).is_err());
    }
}
