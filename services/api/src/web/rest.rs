//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::services::analysis::AnalysisRequest;
use crate::web::middleware::UserScope;
use crate::web::state::AppState;
use analista_core::domain::{AnalysisResult, NewAnalysis, TrendResponse, UserSettings};
use analista_core::ports::PortError;
use analista_core::references::{Anecdote, BookReference, SEED_ANECDOTES, SEED_BOOKS};
use analista_core::teleprompter::Teleprompter;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        trends_handler,
        crate::web::stream::stream_analysis_handler,
        list_library_handler,
        save_analysis_handler,
        delete_analysis_handler,
        get_settings_handler,
        update_settings_handler,
        teleprompter_timing_handler,
        credential_status_handler,
        select_credential_handler,
        references_handler,
    ),
    components(
        schemas(
            TrendResponse,
            AnalysisRequest,
            AnalysisResult,
            NewAnalysis,
            UserSettings,
            TimingResponse,
            CredentialStatus,
            SelectCredentialRequest,
            ReferencesResponse,
        )
    ),
    tags(
        (name = "Analista+ API", description = "Trends, AI analysis generation, library and teleprompter for news commentators.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, IntoParams)]
pub struct TrendsQuery {
    /// Country name, or `Global`. Defaults to the user's default region.
    region: Option<String>,
    /// Topic name, or `Todos`. Defaults to the user's default topic.
    topic: Option<String>,
    /// Skip the cache and ask the model again.
    #[serde(default)]
    force_refresh: bool,
}

#[derive(Deserialize, IntoParams)]
pub struct TimingQuery {
    /// Script length in characters.
    length: Option<usize>,
    /// A saved analysis whose content length should be used instead.
    analysis_id: Option<Uuid>,
    /// Scroll speed; clamped to 1..=50. Defaults to the base speed in settings.
    speed: Option<i64>,
    /// A relative wheel or drag adjustment applied on top of `speed`.
    speed_delta: Option<i64>,
    /// Seconds of playback; when given, the response reports how far the
    /// script has scrolled.
    elapsed_secs: Option<f64>,
}

/// The scroll duration for a script at a given speed.
#[derive(Serialize, ToSchema)]
pub struct TimingResponse {
    content_length: usize,
    speed: u8,
    duration_seconds: f64,
    /// Scrolled fraction in `[0, 1]`, present when `elapsed_secs` was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<f64>,
    finished: bool,
}

#[derive(Serialize, ToSchema)]
pub struct CredentialStatus {
    selected: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct SelectCredentialRequest {
    api_key: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ReferencesResponse {
    #[schema(value_type = Vec<Anecdote>)]
    anecdotes: &'static [Anecdote],
    #[schema(value_type = Vec<BookReference>)]
    books: &'static [BookReference],
}

/// Maps a port error onto an HTTP status and a user-facing message.
pub(crate) fn port_error_response(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::MissingCredential | PortError::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
        PortError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        PortError::Malformed(_) => StatusCode::BAD_GATEWAY,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {:?}", e);
    }
    (status, e.to_string())
}

//=========================================================================================
// Trends
//=========================================================================================

/// Fetch the three trending stories for a region and topic.
///
/// Always answers 200; failures are described by `error` and `needsKeySelection`.
#[utoipa::path(
    get,
    path = "/trends",
    params(TrendsQuery),
    responses(
        (status = 200, description = "Trends, or a described failure", body = TrendResponse)
    )
)]
pub async fn trends_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<TrendsQuery>,
) -> Json<TrendResponse> {
    let settings = app_state.settings.get().await;
    let region = query.region.unwrap_or(settings.default_region);
    let topic = query.topic.unwrap_or(settings.default_topic);

    Json(
        app_state
            .trends
            .fetch_trends(&region, &topic, query.force_refresh)
            .await,
    )
}

//=========================================================================================
// Library
//=========================================================================================

/// List saved analyses, newest first.
#[utoipa::path(
    get,
    path = "/library",
    responses(
        (status = 200, description = "The library", body = Vec<AnalysisResult>)
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "Scopes the library to a user.")
    )
)]
pub async fn list_library_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<UserScope>,
) -> Json<Vec<AnalysisResult>> {
    Json(app_state.library.list(user.id()).await)
}

/// Save an analysis to the library.
#[utoipa::path(
    post,
    path = "/library",
    request_body = NewAnalysis,
    responses(
        (status = 201, description = "Saved", body = AnalysisResult),
        (status = 500, description = "The library could not be written")
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "Scopes the library to a user.")
    )
)]
pub async fn save_analysis_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<UserScope>,
    Json(analysis): Json<NewAnalysis>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let saved = app_state
        .library
        .save(user.id(), analysis)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Delete an analysis from the library.
#[utoipa::path(
    delete,
    path = "/library/{id}",
    responses(
        (status = 204, description = "Deleted (or already absent)"),
        (status = 500, description = "The library could not be written")
    ),
    params(
        ("id" = Uuid, Path, description = "The analysis id."),
        ("x-user-id" = Option<String>, Header, description = "Scopes the library to a user.")
    )
)]
pub async fn delete_analysis_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<UserScope>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    app_state
        .library
        .remove(user.id(), id)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Settings
//=========================================================================================

#[utoipa::path(
    get,
    path = "/settings",
    responses((status = 200, description = "Current settings", body = UserSettings))
)]
pub async fn get_settings_handler(State(app_state): State<Arc<AppState>>) -> Json<UserSettings> {
    Json(app_state.settings.get().await)
}

/// Replace the settings. The teleprompter speed is clamped to 1..=50.
#[utoipa::path(
    put,
    path = "/settings",
    request_body = UserSettings,
    responses(
        (status = 200, description = "Saved settings", body = UserSettings),
        (status = 500, description = "The settings could not be written")
    )
)]
pub async fn update_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Json(settings): Json<UserSettings>,
) -> Result<Json<UserSettings>, (StatusCode, String)> {
    app_state
        .settings
        .update(settings)
        .await
        .map(Json)
        .map_err(port_error_response)
}

//=========================================================================================
// Teleprompter
//=========================================================================================

/// Compute the teleprompter scroll duration for a length or a saved analysis,
/// and optionally the scroll position after some playback.
#[utoipa::path(
    get,
    path = "/teleprompter/timing",
    params(
        TimingQuery,
        ("x-user-id" = Option<String>, Header, description = "Scopes `analysis_id` lookups to a user.")
    ),
    responses(
        (status = 200, description = "Timing", body = TimingResponse),
        (status = 400, description = "Neither length nor analysis_id given"),
        (status = 404, description = "Unknown analysis")
    )
)]
pub async fn teleprompter_timing_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<UserScope>,
    Query(query): Query<TimingQuery>,
) -> Result<Json<TimingResponse>, (StatusCode, String)> {
    let content_length = match (query.analysis_id, query.length) {
        (Some(id), _) => app_state
            .library
            .get(user.id(), id)
            .await
            .map(|analysis| analysis.content.chars().count())
            .ok_or_else(|| port_error_response(PortError::NotFound(format!("Analysis {}", id))))?,
        (None, Some(length)) => length,
        (None, None) => {
            return Err((
                StatusCode::BAD_REQUEST,
                "Either length or analysis_id is required".to_string(),
            ))
        }
    };

    let speed = match query.speed {
        Some(speed) => speed,
        None => i64::from(app_state.settings.get().await.teleprompter_base_speed),
    };

    let mut prompter = Teleprompter::new(content_length, speed);
    if let Some(delta) = query.speed_delta {
        prompter.adjust_speed(delta);
    }
    let progress = query.elapsed_secs.map(|elapsed| {
        prompter.play();
        prompter.advance(elapsed);
        prompter.progress()
    });

    Ok(Json(TimingResponse {
        content_length,
        speed: prompter.speed(),
        duration_seconds: prompter.duration_seconds(),
        progress,
        finished: prompter.is_finished(),
    }))
}

//=========================================================================================
// Credential
//=========================================================================================

/// Whether a usable API key is selected.
#[utoipa::path(
    get,
    path = "/credential",
    responses((status = 200, description = "Credential status", body = CredentialStatus))
)]
pub async fn credential_status_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<CredentialStatus> {
    Json(CredentialStatus {
        selected: app_state.credential.is_selected(),
    })
}

/// Select (or clear, with a null key) the API key used for model calls.
#[utoipa::path(
    put,
    path = "/credential",
    request_body = SelectCredentialRequest,
    responses((status = 200, description = "Credential status", body = CredentialStatus))
)]
pub async fn select_credential_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SelectCredentialRequest>,
) -> Json<CredentialStatus> {
    app_state.credential.select(request.api_key);
    Json(CredentialStatus {
        selected: app_state.credential.is_selected(),
    })
}

//=========================================================================================
// References
//=========================================================================================

/// Seed anecdotes and books for the ANECDOTE and BOOK_REF formats.
#[utoipa::path(
    get,
    path = "/references",
    responses((status = 200, description = "Seed references", body = ReferencesResponse))
)]
pub async fn references_handler() -> Json<ReferencesResponse> {
    Json(ReferencesResponse {
        anecdotes: SEED_ANECDOTES,
        books: SEED_BOOKS,
    })
}
