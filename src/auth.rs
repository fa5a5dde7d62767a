//! # auth — Bearer Token Middleware
//!
//! Token issuance belongs to the account service; this layer only checks
//! the presented credential.
//!
//! ## Mode
//! - `API_TOKEN` unset (or empty) → **Allow All** (Dev Mode)
//! - `API_TOKEN` set → every request needs `Authorization: Bearer <token>`
//!
//! ## Exempt
//! `/api/health` never requires auth.
//!
//! ## Usage
//! ```bash
//! curl -H "Authorization: Bearer $API_TOKEN" http://localhost:3000/api/gaps/stats
//! ```

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::state::SharedState;

pub const HEALTH_PATH: &str = "/api/health";

/// Axum middleware — validates the `Authorization: Bearer` header.
pub async fn require_bearer(
    State(state): State<SharedState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // ── Dev Mode: no token configured ─────────────────────────────────────────
    let Some(expected) = state.config.api_token.as_deref() else {
        return next.run(request).await;
    };

    let path = request.uri().path();
    if path == HEALTH_PATH {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    if provided == Some(expected) {
        next.run(request).await
    } else {
        warn!(path, "❌ Unauthorized request — invalid or missing bearer token");
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "ok":    false,
                "error": "Unauthorized: invalid or missing bearer token",
            })),
        )
            .into_response()
    }
}
