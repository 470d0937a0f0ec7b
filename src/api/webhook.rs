//! Pipeline webhook: admission check and event handler.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::AppState;
use super::error::AppError;
use crate::config::secrets::secret_matches;
use crate::engine::Acknowledgement;
use crate::model::WebhookEvent;

/// Header carrying the shared secret.
pub const SECRET_HEADER: &str = "x-webhook-secret";

/// Reject calls whose secret header does not match the configured secret.
///
/// With no secret configured every call is admitted.
pub async fn require_secret(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.webhook_secret.as_deref() {
        let presented = req
            .headers()
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !secret_matches(expected, presented) {
            tracing::warn!("webhook rejected: bad or missing secret");
            return Err(AppError::Unauthorized("invalid webhook secret".to_string()));
        }
    }
    Ok(next.run(req).await)
}

/// `POST /api/webhooks/pipeline`
pub async fn receive(
    State(state): State<AppState>,
    body: Result<Json<WebhookEvent>, JsonRejection>,
) -> Result<Json<Acknowledgement>, AppError> {
    let Json(envelope) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    tracing::debug!(
        event = %envelope.event,
        job_id = %envelope.content_job_id,
        timestamp = envelope.timestamp.as_deref().unwrap_or("-"),
        "webhook received"
    );
    let ack = state.dispatcher.dispatch(&envelope).await?;
    Ok(Json(ack))
}
