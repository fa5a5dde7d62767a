//! # engine::price
//!
//! **Price Reconciliation** — percentage price change of a stock over a
//! calendar-day window, tolerant of missing trading days.
//!
//! ```text
//! start = today - window_days          end = today
//!   │                                    │
//!   ├─ [1] exact rows on both dates?  ── yes ─▶ (end - start) / start × 100
//!   │
//!   └─ [2] range scan [start, end], sorted by date
//!          < 2 rows              → None
//!          earliest / latest row → (latest - earliest) / earliest × 100
//! ```
//!
//! Weekends and holidays make exact alignment miss on ordinary dates, so
//! the bracketing observations stand in for the endpoints. "No value" is a
//! valid answer and is always `None`, never `0.0`.

use chrono::NaiveDate;
use tracing::debug;

use crate::engine::clock::window_start;
use crate::models::PriceObservation;
use crate::store::{PriceSeriesStore, StoreResult};

/// Percentage change over `window_days` ending on `today`.
///
/// Only store failures are errors; missing rows, null prices and a zero
/// base price all yield `Ok(None)`.
pub async fn compute_price_change(
    store:       &dyn PriceSeriesStore,
    stock_code:  &str,
    window_days: u32,
    today:       NaiveDate,
) -> StoreResult<Option<f64>> {
    let end_date   = today;
    let start_date = window_start(today, window_days);

    // ── [1] Exact endpoints ───────────────────────────────────────────────────
    let start = store.find_price_observation(stock_code, start_date).await?;
    let end   = store.find_price_observation(stock_code, end_date).await?;

    if let (Some(start), Some(end)) = (&start, &end) {
        if let Some(change) = percent_change(start, end) {
            debug!(stock_code, window_days, change, "price change from exact endpoints");
            return Ok(Some(change));
        }
    }

    // ── [2] Closest bracketing observations ───────────────────────────────────
    let mut series = store
        .find_price_observations(stock_code, start_date, end_date)
        .await?;

    if series.len() < 2 {
        debug!(stock_code, window_days, rows = series.len(), "not enough prices in window");
        return Ok(None);
    }

    series.sort_by_key(|p| p.trade_date);
    let (first, last) = (&series[0], &series[series.len() - 1]);
    let change = percent_change(first, last);

    debug!(
        stock_code,
        window_days,
        from = %first.trade_date,
        to   = %last.trade_date,
        ?change,
        "price change from bracketing observations"
    );
    Ok(change)
}

/// Observations for `[date_from, date_to]`, oldest first.
pub async fn price_history(
    store:      &dyn PriceSeriesStore,
    stock_code: &str,
    date_from:  NaiveDate,
    date_to:    NaiveDate,
) -> StoreResult<Vec<PriceObservation>> {
    let mut series = store.find_price_observations(stock_code, date_from, date_to).await?;
    series.sort_by_key(|p| p.trade_date);
    Ok(series)
}

/// `(to - from) / from × 100`, or `None` when either price is missing, the
/// base is zero, or the result is not finite.
fn percent_change(from: &PriceObservation, to: &PriceObservation) -> Option<f64> {
    let base = from.close_f64().filter(|p| *p != 0.0)?;
    let last = to.close_f64()?;
    Some((last - base) / base * 100.0).filter(|c| c.is_finite())
}
