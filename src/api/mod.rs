//! HTTP API served with axum.
//!
//! ## URL layout
//!
//! ```text
//! GET    /drinks          public, short recipes
//! GET    /drinks-detail   get:drinks-detail
//! POST   /drinks          post:drinks
//! PATCH  /drinks/{id}     patch:drinks
//! DELETE /drinks/{id}     delete:drinks
//! GET    /environment     front-end environment record
//! GET    /health
//! ```
//!
//! [`serve`] drives the listener until the [`CancellationToken`] fires.

mod drinks;
mod error;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    routing::{get, patch},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::TokenVerifier;
use crate::config::{Environment, ServerConfig};
use crate::error::AppError;
use crate::store::DrinkStore;

pub use error::ApiError;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone; all fields are reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DrinkStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub environment: Arc<Environment>,
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: AppState, server: &ServerConfig) -> Result<Router, AppError> {
    Ok(Router::new()
        .route("/drinks", get(drinks::list_short).post(drinks::create))
        .route("/drinks-detail", get(drinks::list_long))
        .route("/drinks/{id}", patch(drinks::update).delete(drinks::delete))
        .route("/environment", get(environment))
        .route("/health", get(health))
        .fallback(|| async { ApiError::NotFound })
        .method_not_allowed_fallback(|| async { ApiError::MethodNotAllowed })
        .with_state(state)
        .layer(cors_layer(server.cors_allow_origin.as_deref())?)
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, AppError> {
    let allow_origin = match origin {
        Some(o) => AllowOrigin::exact(
            HeaderValue::from_str(o)
                .map_err(|e| AppError::Config(format!("invalid cors_allow_origin '{o}': {e}")))?,
        ),
        None => AllowOrigin::any(),
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ]))
}

/// GET /environment
async fn environment(State(state): State<AppState>) -> Json<Value> {
    Json(state.environment.to_frontend_json())
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "success": true, "status": "ok" }))
}

// ── Server loop ───────────────────────────────────────────────────────────────

pub async fn serve(
    bind_addr: &str,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "api listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("axum server error: {e}")))?;

    info!("api shut down");
    Ok(())
}
