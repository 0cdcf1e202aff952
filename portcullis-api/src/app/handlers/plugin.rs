//! Authorization plugin protocol endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::{error, field, instrument, warn};

use crate::app::authz::decide;
use crate::app::wire::{ActivateResponse, AuthzRequest, AuthzResponse};
use crate::app::{ApiError, AppState};

pub async fn activate() -> Json<ActivateResponse> {
    Json(ActivateResponse {
        implements: vec!["authz"],
    })
}

/// Decide one request. Rule loading and path resolution block, so the
/// decision runs on the blocking pool and is bounded by the configured
/// timeout; a decision that does not finish in time is refused.
#[instrument(skip_all, fields(method = field::Empty, uri = field::Empty))]
pub async fn authz_request(
    State(state): State<AppState>,
    payload: Result<Json<AuthzRequest>, JsonRejection>,
) -> Result<Json<AuthzResponse>, ApiError> {
    let Json(req) = payload?;
    let span = tracing::Span::current();
    span.record("method", req.request_method.as_str());
    span.record("uri", req.request_uri.as_str());

    let timeout = state.decision_timeout;
    let task = tokio::task::spawn_blocking(move || {
        decide(&state.store, &state.anonymous_user, &req)
    });

    let resp = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            error!(error = %e, "decision task failed");
            AuthzResponse::error("authorization failed")
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "decision timed out");
            AuthzResponse::error(format!(
                "authorization timed out after {}ms",
                timeout.as_millis()
            ))
        }
    };
    Ok(Json(resp))
}

/// Responses are never inspected.
pub async fn authz_response(
    payload: Result<Json<AuthzRequest>, JsonRejection>,
) -> Result<Json<AuthzResponse>, ApiError> {
    let Json(_) = payload?;
    Ok(Json(AuthzResponse::allow()))
}
