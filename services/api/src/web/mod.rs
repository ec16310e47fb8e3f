pub mod middleware;
pub mod rest;
pub mod state;
pub mod stream;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};

pub use middleware::user_scope;
pub use rest::ApiDoc;
pub use state::AppState;

/// Builds the API router. CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/trends", get(rest::trends_handler))
        .route("/analysis/stream", post(stream::stream_analysis_handler))
        .route(
            "/library",
            get(rest::list_library_handler).post(rest::save_analysis_handler),
        )
        .route("/library/{id}", delete(rest::delete_analysis_handler))
        .route(
            "/settings",
            get(rest::get_settings_handler).put(rest::update_settings_handler),
        )
        .route("/teleprompter/timing", get(rest::teleprompter_timing_handler))
        .route(
            "/credential",
            get(rest::credential_status_handler).put(rest::select_credential_handler),
        )
        .route("/references", get(rest::references_handler))
        .layer(axum_middleware::from_fn(user_scope))
        .with_state(app_state)
}
