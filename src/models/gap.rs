//! # models::gap
//!
//! Defines [`GapSignal`] — one detected anomaly linking a news event to a
//! price-return surprise — plus its two classification labels.
//!
//! Signals are produced by the upstream news-analysis pipeline and are
//! read-only here: the engine borrows query results and never writes back.
//! `direction` / `magnitude` are opaque labels assigned by the producer and
//! are never re-derived from `z_score`.

use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── Direction ────────────────────────────────────────────────────────────────

/// Whether the actual return overshot or undershot the model expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Over-reaction: actual return above expectation (positive z-score).
    Over,
    /// Under-reaction: actual return below expectation (negative z-score).
    Under,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Over  => "OVER",
            Direction::Under => "UNDER",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gap direction '{0}' (expected OVER or UNDER)")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OVER"  => Ok(Direction::Over),
            "UNDER" => Ok(Direction::Under),
            _       => Err(UnknownDirection(s.to_string())),
        }
    }
}

// ─── Magnitude ────────────────────────────────────────────────────────────────

/// Tier label for the size of the surprise.
///
/// The producer currently emits `EXTREME` (|z| ≥ 3), `HIGH` (|z| ≥ 2) and
/// `MODERATE`, but the threshold table lives upstream, so any label is
/// accepted and passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Magnitude(String);

impl Magnitude {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── GapSignal ────────────────────────────────────────────────────────────────

/// A stored gap signal, exactly as the ingestion pipeline wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapSignal {
    /// Surrogate id assigned by the store.
    pub id: i64,

    pub news_id: String,

    #[serde(default)]
    pub news_title: Option<String>,

    /// Exchange ticker, at most 10 characters (e.g. `"005930"`).
    pub stock_code: String,

    #[serde(default)]
    pub stock_name: Option<String>,

    /// Category of the triggering news event.
    pub event_code: String,

    /// Date of the triggering news. A signal without one never falls
    /// inside any lookback window.
    #[serde(default)]
    pub news_date: Option<NaiveDate>,

    /// Trading days ahead over which the return is measured.
    pub horizon: i32,

    #[serde(default)]
    pub actual_return: Option<BigDecimal>,

    #[serde(default)]
    pub expected_return: Option<BigDecimal>,

    #[serde(default)]
    pub expected_std: Option<BigDecimal>,

    /// `(actual_return - expected_return) / expected_std`, computed upstream.
    #[serde(default)]
    pub z_score: Option<BigDecimal>,

    #[serde(default)]
    pub direction: Option<Direction>,

    #[serde(default)]
    pub magnitude: Option<Magnitude>,

    /// Size of the historical sample behind the expectation model.
    #[serde(default)]
    pub sample_count: Option<i32>,

    pub detected_at: DateTime<Utc>,
}

impl GapSignal {
    /// z-score as a plain float, `None` when absent.
    #[inline]
    pub fn z_score_f64(&self) -> Option<f64> {
        decimal_to_f64(self.z_score.as_ref())
    }

    /// |z-score|, used for ranking and the `min_abs_z` filter.
    #[inline]
    pub fn abs_z(&self) -> Option<f64> {
        self.z_score_f64().map(f64::abs)
    }
}

/// Converts an optional store decimal into a display float.
///
/// Goes through the decimal text so `3.4` stays `3.4` rather than picking
/// up binary noise from scaling the unscaled integer.
pub fn decimal_to_f64(value: Option<&BigDecimal>) -> Option<f64> {
    value
        .and_then(|v| v.to_string().parse::<f64>().ok().or_else(|| v.to_f64()))
        .filter(|v| v.is_finite())
}
