//! Readiness guard for ledger-backed routes.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::error::ApiError;
use crate::metrics::metric_names;
use crate::server::AppState;

/// Answer 503 without reaching the handler unless the ledger connection is
/// `Connected`. The check is a snapshot read and never waits on `connect()`.
pub async fn require_connected(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match state.connection.require_connected() {
        Ok(_) => next.run(request).await,
        Err(e) => {
            state
                .metrics
                .inc_counter(metric_names::NOT_READY_REJECTIONS)
                .await;
            debug!(path = %request.uri().path(), error = %e, "Rejected before ledger connection");
            ApiError::from(e).into_response()
        }
    }
}
