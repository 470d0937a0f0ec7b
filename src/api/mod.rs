//! HTTP surface: the pipeline webhook and a health check.
//!
//! - `POST /api/webhooks/pipeline` (shared-secret admission)
//! - `GET  /health` (unauthenticated)

pub mod error;
pub mod webhook;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Router, middleware};
use secrecy::SecretString;

use crate::engine::Dispatcher;

pub use error::AppError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub webhook_secret: Option<Arc<SecretString>>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, webhook_secret: Option<SecretString>) -> Self {
        Self {
            dispatcher,
            webhook_secret: webhook_secret.map(Arc::new),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let webhooks = Router::new()
        .route("/api/webhooks/pipeline", post(webhook::receive))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            webhook::require_secret,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(webhooks)
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}
