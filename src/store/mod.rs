//! # store — Record-store ports
//!
//! The engine reads two kinds of records it does not own:
//!
//! | Port                 | Records               | Writer                    |
//! |----------------------|-----------------------|---------------------------|
//! | [`GapRecordStore`]   | [`GapSignal`]         | news-analysis pipeline    |
//! | [`PriceSeriesStore`] | [`PriceObservation`]  | daily price ingestion     |
//!
//! Both are `async_trait` objects so the HTTP layer can hold either the
//! in-memory store (dev / tests) or the PostgreSQL store behind one
//! `Arc<dyn …>`.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Direction, GapBreakdown, GapSignal, Magnitude, PriceObservation};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connectivity or query failure in the backing store.
    #[error("store backend failure: {0}")]
    Backend(String),

    /// A row came back that cannot be mapped onto the domain model.
    #[error("malformed record: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ─── Window Membership ────────────────────────────────────────────────────────

/// The one "is this signal inside the lookback window" rule.
///
/// Open-ended towards now: anything dated on or after `from` is in.
/// A signal with no news date is never in any window.
#[inline]
pub fn in_window(news_date: Option<NaiveDate>, from: NaiveDate) -> bool {
    matches!(news_date, Some(date) if date >= from)
}

// ─── Filtered Query ───────────────────────────────────────────────────────────

/// Parameters for [`GapRecordStore::find_gap_signals_filtered`].
#[derive(Debug, Clone, PartialEq)]
pub struct GapQuery {
    pub news_date_from: NaiveDate,
    /// `None` matches every direction.
    pub direction:      Option<Direction>,
    /// `None` matches every magnitude.
    pub magnitude:      Option<Magnitude>,
    /// Minimum |z-score|, inclusive.
    pub min_abs_z:      f64,
}

impl GapQuery {
    /// In-memory form of the filter predicate.
    pub fn matches(&self, gap: &GapSignal) -> bool {
        if !in_window(gap.news_date, self.news_date_from) {
            return false;
        }
        if let Some(direction) = self.direction {
            if gap.direction != Some(direction) {
                return false;
            }
        }
        if let Some(magnitude) = &self.magnitude {
            if gap.magnitude.as_ref() != Some(magnitude) {
                return false;
            }
        }
        // Unscored signals cannot satisfy a |z| threshold.
        gap.abs_z().map(|z| z >= self.min_abs_z).unwrap_or(false)
    }
}

// ─── Ports ────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait GapRecordStore: Send + Sync {
    /// Signals for one stock dated on or after `news_date_from`.
    async fn find_gap_signals(
        &self,
        stock_code:     &str,
        news_date_from: NaiveDate,
    ) -> StoreResult<Vec<GapSignal>>;

    /// Signals matching `query`, ordered by |z-score| descending.
    async fn find_gap_signals_filtered(&self, query: &GapQuery) -> StoreResult<Vec<GapSignal>>;

    /// In-window signal count, optionally restricted to one direction.
    async fn count_gap_signals(
        &self,
        news_date_from: NaiveDate,
        direction:      Option<Direction>,
    ) -> StoreResult<u64>;

    /// Mean z-score of in-window signals; `None` if there are none.
    async fn average_z_score(&self, news_date_from: NaiveDate) -> StoreResult<Option<f64>>;

    /// Full scan of every stored signal.
    async fn find_all_gap_signals(&self) -> StoreResult<Vec<GapSignal>>;

    /// Grouped counts for the detailed statistics view.
    ///
    /// Default: full scan + in-memory group-by through [`in_window`].
    /// Stores that can group server-side override this; the result must
    /// be identical.
    async fn aggregate(&self, news_date_from: NaiveDate) -> StoreResult<GapBreakdown> {
        let all = self.find_all_gap_signals().await?;
        Ok(breakdown_of(&all, news_date_from))
    }

    /// Short backend name for the health endpoint.
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
pub trait PriceSeriesStore: Send + Sync {
    /// Exact `(stock_code, date)` lookup.
    async fn find_price_observation(
        &self,
        stock_code: &str,
        date:       NaiveDate,
    ) -> StoreResult<Option<PriceObservation>>;

    /// Observations with `date_from <= trade_date <= date_to`, unordered.
    async fn find_price_observations(
        &self,
        stock_code: &str,
        date_from:  NaiveDate,
        date_to:    NaiveDate,
    ) -> StoreResult<Vec<PriceObservation>>;
}

/// In-memory group-by shared by the default `aggregate` implementation.
pub fn breakdown_of(signals: &[GapSignal], news_date_from: NaiveDate) -> GapBreakdown {
    signals
        .iter()
        .filter(|gap| in_window(gap.news_date, news_date_from))
        .fold(GapBreakdown::default(), |mut acc, gap| {
            acc.record(gap);
            acc
        })
}
