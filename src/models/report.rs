//! # models::report
//!
//! Caller-facing result shapes produced by the Gap Query Engine.
//!
//! Everything here is plain data: decimals are already flattened to `f64`
//! and every "no value" is an explicit `None` (serialized as `null`), never
//! a sentinel zero.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::gap::{decimal_to_f64, Direction, GapSignal, Magnitude};

// ─── Gap Check ────────────────────────────────────────────────────────────────

/// One signal projected for display inside a [`GapCheckResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapSignalView {
    pub news_id:         String,
    pub news_title:      Option<String>,
    pub event_code:      String,
    pub news_date:       Option<NaiveDate>,
    pub horizon:         i32,
    pub z_score:         Option<f64>,
    pub direction:       Option<Direction>,
    pub magnitude:       Option<Magnitude>,
    pub actual_return:   Option<f64>,
    pub expected_return: Option<f64>,
    pub sample_count:    Option<i32>,
}

impl From<&GapSignal> for GapSignalView {
    fn from(gap: &GapSignal) -> Self {
        Self {
            news_id:         gap.news_id.clone(),
            news_title:      gap.news_title.clone(),
            event_code:      gap.event_code.clone(),
            news_date:       gap.news_date,
            horizon:         gap.horizon,
            z_score:         gap.z_score_f64(),
            direction:       gap.direction,
            magnitude:       gap.magnitude.clone(),
            actual_return:   decimal_to_f64(gap.actual_return.as_ref()),
            expected_return: decimal_to_f64(gap.expected_return.as_ref()),
            sample_count:    gap.sample_count,
        }
    }
}

/// "Does this stock have gaps in the last N days?"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapCheckResult {
    pub stock_code:   String,
    pub stock_name:   Option<String>,
    pub days:         u32,
    pub has_gap:      bool,
    pub gap_count:    usize,
    pub gap_signals:  Vec<GapSignalView>,
    /// Percentage price change over the same window, `None` if not computable.
    pub price_change: Option<f64>,
}

// ─── Gap History ──────────────────────────────────────────────────────────────

/// One row of the filtered, |z|-ranked gap listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapHistoryEntry {
    pub stock_name: Option<String>,
    pub stock_code: String,
    pub event_code: String,
    pub date:       Option<NaiveDate>,
    pub direction:  Option<Direction>,
    pub magnitude:  Option<Magnitude>,
    pub z_score:    Option<f64>,
}

impl From<&GapSignal> for GapHistoryEntry {
    fn from(gap: &GapSignal) -> Self {
        Self {
            stock_name: gap.stock_name.clone(),
            stock_code: gap.stock_code.clone(),
            event_code: gap.event_code.clone(),
            date:       gap.news_date,
            direction:  gap.direction,
            magnitude:  gap.magnitude.clone(),
            z_score:    gap.z_score_f64(),
        }
    }
}

/// Envelope returned by `GET /api/gaps/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapListResponse {
    pub gaps: Vec<GapHistoryEntry>,
}

// ─── Statistics ───────────────────────────────────────────────────────────────

/// Cheap aggregate over a window: counts plus the mean z-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapStats {
    pub total_count: u64,
    pub over_count:  u64,
    pub under_count: u64,
    /// `None` when the window holds no scored signal.
    pub avg_z_score: Option<f64>,
}

/// Three independent partitions of the in-window signal set.
///
/// A signal whose label for a given dimension is null is counted in
/// `total` only, so each map's values may sum to less than `total`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapBreakdown {
    pub total:         u64,
    pub by_direction:  BTreeMap<String, u64>,
    pub by_magnitude:  BTreeMap<String, u64>,
    pub by_event_code: BTreeMap<String, u64>,
}

impl GapBreakdown {
    /// Folds one in-window signal into the counters.
    pub fn record(&mut self, gap: &GapSignal) {
        self.total += 1;
        if let Some(direction) = gap.direction {
            *self.by_direction.entry(direction.to_string()).or_default() += 1;
        }
        if let Some(magnitude) = &gap.magnitude {
            *self.by_magnitude.entry(magnitude.to_string()).or_default() += 1;
        }
        *self.by_event_code.entry(gap.event_code.clone()).or_default() += 1;
    }
}

/// Detailed statistics payload for `GET /api/gaps/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapStatisticsDetail {
    pub period_days: u32,
    #[serde(flatten)]
    pub breakdown:   GapBreakdown,
}
