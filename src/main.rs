//! # Gapscope — News Gap Query & Statistics Backend
//!
//! ```text
//!  ┌──────────────────┐  writes   ┌──────────────────────────────┐
//!  │ news-analysis    │ ────────▶ │ news_gaps                    │◀─┐
//!  │ pipeline         │           └──────────────────────────────┘  │ GapRecordStore
//!  └──────────────────┘                                             │
//!  ┌──────────────────┐  writes   ┌──────────────────────────────┐  │
//!  │ price ingestion  │ ────────▶ │ stock_daily_prices           │◀─┤ PriceSeriesStore
//!  └──────────────────┘           └──────────────────────────────┘  │
//!                                                                   │
//!  ┌──────────────────┐  GET /api/gaps/*   ┌───────────────────┐    │
//!  │  Dashboard       │ ─────────────────▶ │ GapEngine         │────┘
//!  └──────────────────┘  GET /api/prices/* └───────────────────┘
//! ```
//!
//! ## Environment Variables
//!
//! See [`config`]. `RUST_LOG` overrides the default `gapscope=debug` filter.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod auth;
mod config;
mod engine;
mod error;
mod models;
mod routes;
mod state;
mod store;

use config::AppConfig;
use engine::GapEngine;
use routes::build_router;
use state::build_state;
use store::memory::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("gapscope=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════════════════╗
  ║              GAPSCOPE — Gap Query Backend             ║
  ║   Check · List · Stats · Price Reconciliation         ║
  ╚═══════════════════════════════════════════════════════╝"#);

    // ── 3. Config ─────────────────────────────────────────────────────────────
    let config = AppConfig::from_env()?;

    // ── 4. Store + engine ─────────────────────────────────────────────────────
    let engine = build_engine(&config).await?;
    info!(store = engine.backend_name(), "Record store ready");

    // ── 5. Router ─────────────────────────────────────────────────────────────
    let addr = config.bind_addr;
    let app = build_router(build_state(engine, config));

    // ── 6. Bind & Serve ───────────────────────────────────────────────────────
    info!(?addr, "🚀 Gapscope server starting");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "postgres")]
async fn build_engine(config: &AppConfig) -> anyhow::Result<GapEngine> {
    if let Some(url) = config.database_url.as_deref() {
        let pool = store::postgres::init_pool(url, config.db_max_connections).await?;
        let pg = Arc::new(store::postgres::PgStore::new(pool));
        return Ok(GapEngine::new(pg.clone(), pg));
    }
    memory_engine(config).await
}

#[cfg(not(feature = "postgres"))]
async fn build_engine(config: &AppConfig) -> anyhow::Result<GapEngine> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but the binary was built without the `postgres` feature");
    }
    memory_engine(config).await
}

async fn memory_engine(config: &AppConfig) -> anyhow::Result<GapEngine> {
    let store = match &config.seed_file {
        Some(path) => MemoryStore::from_seed_file(path).await?,
        None => {
            tracing::warn!("No DATABASE_URL or SEED_FILE, serving an empty in-memory store");
            MemoryStore::new()
        }
    };
    let store = Arc::new(store);
    Ok(GapEngine::new(store.clone(), store))
}
