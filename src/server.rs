//! HTTP surface for the translation pipeline.
//!
//! - `GET /translate?from=&to=&original=` and `POST /json` translate text
//! - `GET /languages` lists the catalog
//! - `GET /health` reports liveness and catalog size
//! - `POST /admin/refresh-languages` and `POST /admin/reset-cache` run the
//!   scheduled maintenance jobs on demand (require `X-API-Key`)

use crate::cache::TranslationCache;
use crate::catalog::LanguageCatalog;
use crate::config::Config;
use crate::db::StoreError;
use crate::error::TranslateError;
use crate::model::{Language, Translation};
use crate::provider::ProviderError;
use crate::scheduler::{run_cache_reset, run_catalog_refresh};
use crate::translator::Translator;
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AppState {
    pub translator: Arc<Translator>,
    pub catalog: Arc<LanguageCatalog>,
    pub cache: TranslationCache,
    /// Admin endpoints are disabled when `None`
    pub api_key: Option<String>,
}

/// Translation request, from either the query string or a JSON body.
///
/// Missing fields default to empty so validation reports them with the
/// pipeline's own error messages.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TranslateRequest {
    #[serde(alias = "From")]
    pub from: String,
    #[serde(alias = "To")]
    pub to: String,
    #[serde(alias = "text", alias = "Original", alias = "Text")]
    pub original: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for TranslateError {
    fn into_response(self) -> Response {
        let status = match &self {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            TranslateError::ProviderUnavailable(_) => StatusCode::FAILED_DEPENDENCY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Translation failed: {}", self);
        } else {
            warn!("Translation request failed: {}", self);
        }

        error_response(status, self.to_string())
    }
}

#[derive(Debug, Error)]
enum AdminError {
    #[error("not found")]
    Disabled,

    #[error("unauthorized")]
    Unauthorized,

    #[error("language catalog refresh failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("cache reset failed: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::Disabled => StatusCode::NOT_FOUND,
            AdminError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdminError::Provider(_) => StatusCode::FAILED_DEPENDENCY,
            AdminError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() || status == StatusCode::FAILED_DEPENDENCY {
            error!("Admin request failed: {}", self);
        }

        error_response(status, self.to_string())
    }
}

/// Constant-time string comparison for API keys
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AdminError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Err(AdminError::Disabled);
    };

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if constant_time_compare(provided, expected) {
        Ok(())
    } else {
        warn!("Rejected admin request with missing or invalid API key");
        Err(AdminError::Unauthorized)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/translate", get(translate_query))
        .route("/json", post(translate_json))
        .route("/languages", get(list_languages))
        .route("/health", get(health))
        .route("/admin/refresh-languages", post(refresh_languages))
        .route("/admin/reset-cache", post(reset_cache))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind to `0.0.0.0:{port}` and serve until Ctrl-C
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("✓ Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

async fn translate_query(
    State(state): State<AppState>,
    Query(request): Query<TranslateRequest>,
) -> Result<Json<Translation>, TranslateError> {
    run_translation(&state, request).await
}

async fn translate_json(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<Translation>, TranslateError> {
    run_translation(&state, request).await
}

async fn run_translation(
    state: &AppState,
    request: TranslateRequest,
) -> Result<Json<Translation>, TranslateError> {
    let translation = state
        .translator
        .translate(&request.from, &request.to, &request.original)
        .await?;
    Ok(Json(translation))
}

async fn list_languages(State(state): State<AppState>) -> Response {
    match state.catalog.current().await {
        Ok(snapshot) => Json(snapshot.languages().to_vec()).into_response(),
        Err(e) => TranslateError::ProviderUnavailable(e).into_response(),
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    languages: usize,
    catalog_refreshed_at: Option<chrono::DateTime<chrono::Utc>>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.catalog.snapshot();
    Json(HealthResponse {
        status: "ok",
        languages: snapshot.as_ref().map_or(0, |s| s.len()),
        catalog_refreshed_at: snapshot.map(|s| s.refreshed_at()),
    })
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    languages: Vec<Language>,
}

async fn refresh_languages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, AdminError> {
    authorize(&state, &headers)?;

    let count = run_catalog_refresh(&state.catalog).await?;
    info!("Manual catalog refresh completed ({} languages)", count);

    Ok(Json(RefreshResponse {
        languages: state.catalog.languages(),
    }))
}

#[derive(Debug, Serialize)]
struct ResetResponse {
    removed: u64,
}

async fn reset_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ResetResponse>, AdminError> {
    authorize(&state, &headers)?;

    let removed = run_cache_reset(&state.cache).await?;
    Ok(Json(ResetResponse { removed }))
}
