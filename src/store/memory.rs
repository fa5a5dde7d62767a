//! # store::memory
//!
//! In-process implementation of both ports. Used when the service runs
//! without PostgreSQL (dev mode, optionally seeded from a JSON file) and by
//! every unit test.
//!
//! ## Seed file format
//! ```json
//! {
//!   "gap_signals": [ { "id": 1, "news_id": "n-1", "stock_code": "005930", ... } ],
//!   "prices":      [ { "stock_code": "005930", "trade_date": "2024-03-01", "closing_price": "71200" } ]
//! }
//! ```

use std::cmp::Ordering;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::{Direction, GapSignal, PriceObservation};
use crate::store::{in_window, GapQuery, GapRecordStore, PriceSeriesStore, StoreResult};

#[derive(Debug, Default, Deserialize)]
struct Seed {
    #[serde(default)]
    gap_signals: Vec<GapSignal>,
    #[serde(default)]
    prices:      Vec<PriceObservation>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    gaps:   RwLock<Vec<GapSignal>>,
    prices: RwLock<Vec<PriceObservation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(gaps: Vec<GapSignal>, prices: Vec<PriceObservation>) -> Self {
        Self {
            gaps:   RwLock::new(gaps),
            prices: RwLock::new(prices),
        }
    }

    /// Loads a JSON seed file (see module docs).
    pub async fn from_seed_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let seed: Seed = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse seed file {}", path.display()))?;

        info!(
            gap_signals = seed.gap_signals.len(),
            prices      = seed.prices.len(),
            "📦 In-memory store seeded"
        );
        Ok(Self::with_records(seed.gap_signals, seed.prices))
    }
}

#[async_trait]
impl GapRecordStore for MemoryStore {
    async fn find_gap_signals(
        &self,
        stock_code:     &str,
        news_date_from: NaiveDate,
    ) -> StoreResult<Vec<GapSignal>> {
        let gaps = self.gaps.read().await;
        Ok(gaps
            .iter()
            .filter(|g| g.stock_code == stock_code && in_window(g.news_date, news_date_from))
            .cloned()
            .collect())
    }

    async fn find_gap_signals_filtered(&self, query: &GapQuery) -> StoreResult<Vec<GapSignal>> {
        let gaps = self.gaps.read().await;
        let mut matched: Vec<GapSignal> = gaps.iter().filter(|g| query.matches(g)).cloned().collect();

        // ORDER BY ABS(z_score) DESC
        matched.sort_by(|a, b| {
            b.abs_z()
                .partial_cmp(&a.abs_z())
                .unwrap_or(Ordering::Equal)
        });
        Ok(matched)
    }

    async fn count_gap_signals(
        &self,
        news_date_from: NaiveDate,
        direction:      Option<Direction>,
    ) -> StoreResult<u64> {
        let gaps = self.gaps.read().await;
        let count = gaps
            .iter()
            .filter(|g| in_window(g.news_date, news_date_from))
            .filter(|g| direction.map_or(true, |d| g.direction == Some(d)))
            .count();
        Ok(count as u64)
    }

    async fn average_z_score(&self, news_date_from: NaiveDate) -> StoreResult<Option<f64>> {
        let gaps = self.gaps.read().await;
        let scores: Vec<f64> = gaps
            .iter()
            .filter(|g| in_window(g.news_date, news_date_from))
            .filter_map(GapSignal::z_score_f64)
            .collect();

        if scores.is_empty() {
            return Ok(None);
        }
        Ok(Some(scores.iter().sum::<f64>() / scores.len() as f64))
    }

    async fn find_all_gap_signals(&self) -> StoreResult<Vec<GapSignal>> {
        Ok(self.gaps.read().await.clone())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl PriceSeriesStore for MemoryStore {
    async fn find_price_observation(
        &self,
        stock_code: &str,
        date:       NaiveDate,
    ) -> StoreResult<Option<PriceObservation>> {
        let prices = self.prices.read().await;
        Ok(prices
            .iter()
            .find(|p| p.stock_code == stock_code && p.trade_date == date)
            .cloned())
    }

    async fn find_price_observations(
        &self,
        stock_code: &str,
        date_from:  NaiveDate,
        date_to:    NaiveDate,
    ) -> StoreResult<Vec<PriceObservation>> {
        let prices = self.prices.read().await;
        Ok(prices
            .iter()
            .filter(|p| p.stock_code == stock_code)
            .filter(|p| p.trade_date >= date_from && p.trade_date <= date_to)
            .cloned()
            .collect())
    }
}
