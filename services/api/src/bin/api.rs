//! services/api/src/bin/api.rs

use analista_core::ports::UsageStatsService;
use api_lib::{
    adapters::{CredentialSlot, FileStore, GeminiAdapter, PgStatsAdapter},
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, HeaderValue, Method};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Local Store ---
    let store = Arc::new(FileStore::open(&config.data_dir).await?);
    info!("Local store at {}", store.root().display());

    // --- 3. Optional Statistics Database ---
    let stats: Option<Arc<dyn UsageStatsService>> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to statistics database...");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let adapter = PgStatsAdapter::new(pool);
            adapter.run_migrations().await?;
            info!("Statistics database ready.");
            Some(Arc::new(adapter))
        }
        None => {
            warn!("DATABASE_URL not set; usage statistics will not be mirrored.");
            None
        }
    };

    // --- 4. Model Adapter ---
    let credential = CredentialSlot::new(config.gemini_api_key.clone());
    if !credential.is_selected() {
        warn!("GEMINI_API_KEY not set; a key must be selected through /credential.");
    }
    let model = Arc::new(GeminiAdapter::new(
        config.gemini_base_url.clone(),
        config.gemini_model.clone(),
        credential.clone(),
        config.http_timeout,
    )?);

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(
        AppState::new(model, credential, store, stats, &config.trends).await,
    );

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(web::middleware::USER_ID_HEADER),
        ]);

    // --- 6. Create the Web Router ---
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
