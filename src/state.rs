//! # state
//!
//! Shared state injected into every Axum handler. The engine is stateless,
//! so there is nothing to lock here: cloning the `Arc` is all a handler does.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::GapEngine;

pub struct AppState {
    pub engine: GapEngine,
    pub config: AppConfig,
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;

pub fn build_state(engine: GapEngine, config: AppConfig) -> SharedState {
    Arc::new(AppState { engine, config })
}
