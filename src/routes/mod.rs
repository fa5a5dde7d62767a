//! HTTP transport: maps routes onto [`GapEngine`](crate::engine::GapEngine) calls.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth, state::SharedState};

pub mod gaps;
pub mod prices;

/// GET /api/health — liveness, the active store backend and the date windows
/// are anchored to.
pub async fn health_check(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "ok":    true,
        "store": state.engine.backend_name(),
        "today": state.engine.today(),
    }))
}

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Gaps ──────────────────────────────────────────────────────────────
        .route("/api/gaps/check/:stock_code", get(gaps::check_gaps))
        .route("/api/gaps/list",              get(gaps::list_gaps))
        .route("/api/gaps/stats",             get(gaps::detailed_stats))
        .route("/api/gaps/stats/simple",      get(gaps::simple_stats))
        // ── Prices ────────────────────────────────────────────────────────────
        .route("/api/prices/:stock_code",     get(prices::price_range))
        // ── Ops ───────────────────────────────────────────────────────────────
        .route(auth::HEALTH_PATH,             get(health_check))
        // ── Middleware ────────────────────────────────────────────────────────
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth::require_bearer))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
