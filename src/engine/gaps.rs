//! # engine::gaps
//!
//! **Gap Query Engine** — shapes gap-signal queries into caller-facing
//! results. Every operation is a stateless read → shape → return pipeline;
//! nothing here mutates the stores.
//!
//! | Operation                    | Store calls                                   |
//! |------------------------------|-----------------------------------------------|
//! | [`GapEngine::check_gaps`]    | `find_gap_signals` + price reconciliation     |
//! | [`GapEngine::list_gaps_filtered`] | `find_gap_signals_filtered` (|z| desc)   |
//! | [`GapEngine::calculate_stats`] | 3 × `count_gap_signals` + `average_z_score` |
//! | [`GapEngine::calculate_detailed_stats`] | `aggregate`                        |
//!
//! A store failure aborts the whole operation; partial aggregates are
//! never returned.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::engine::clock::{window_start, Clock, SystemClock};
use crate::engine::price::{compute_price_change, price_history};
use crate::models::{
    Direction, GapCheckResult, GapHistoryEntry, GapSignalView, GapStatisticsDetail, GapStats, Magnitude,
    PriceObservation,
};
use crate::store::{GapQuery, GapRecordStore, PriceSeriesStore, StoreResult};

// ─── Filter ───────────────────────────────────────────────────────────────────

/// Parameters for [`GapEngine::list_gaps_filtered`].
#[derive(Debug, Clone, PartialEq)]
pub struct GapFilter {
    pub window_days: u32,
    pub direction:   Option<Direction>,
    pub magnitude:   Option<Magnitude>,
    /// Minimum |z-score|, inclusive.
    pub min_abs_z:   f64,
    /// Maximum number of entries returned.
    pub limit:       usize,
}

impl GapFilter {
    pub const DEFAULT_WINDOW_DAYS: u32   = 100;
    pub const DEFAULT_MIN_ABS_Z:   f64   = 2.0;
    pub const DEFAULT_LIMIT:       usize = 100;
}

impl Default for GapFilter {
    fn default() -> Self {
        Self {
            window_days: Self::DEFAULT_WINDOW_DAYS,
            direction:   None,
            magnitude:   None,
            min_abs_z:   Self::DEFAULT_MIN_ABS_Z,
            limit:       Self::DEFAULT_LIMIT,
        }
    }
}

// ─── Engine ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GapEngine {
    gaps:   Arc<dyn GapRecordStore>,
    prices: Arc<dyn PriceSeriesStore>,
    clock:  Arc<dyn Clock>,
}

impl GapEngine {
    pub fn new(gaps: Arc<dyn GapRecordStore>, prices: Arc<dyn PriceSeriesStore>) -> Self {
        Self::with_clock(gaps, prices, Arc::new(SystemClock))
    }

    pub fn with_clock(
        gaps:   Arc<dyn GapRecordStore>,
        prices: Arc<dyn PriceSeriesStore>,
        clock:  Arc<dyn Clock>,
    ) -> Self {
        Self { gaps, prices, clock }
    }

    pub fn backend_name(&self) -> &'static str {
        self.gaps.backend_name()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn window_from(&self, window_days: u32) -> NaiveDate {
        window_start(self.clock.today(), window_days)
    }

    // ── Check ─────────────────────────────────────────────────────────────────

    /// Gaps for one stock in the last `window_days`, plus the price change
    /// over the same window.
    pub async fn check_gaps(&self, stock_code: &str, window_days: u32) -> StoreResult<GapCheckResult> {
        let today = self.clock.today();
        let from  = window_start(today, window_days);

        // The two reads are independent; slight skew between them is fine.
        let (gaps, price_change) = tokio::try_join!(
            self.gaps.find_gap_signals(stock_code, from),
            compute_price_change(self.prices.as_ref(), stock_code, window_days, today),
        )?;

        // Store order is unspecified: any one signal's name will do.
        let stock_name = gaps.first().and_then(|g| g.stock_name.clone());
        let gap_signals: Vec<GapSignalView> = gaps.iter().map(GapSignalView::from).collect();

        info!(
            stock_code,
            window_days,
            gap_count = gap_signals.len(),
            ?price_change,
            "🔍 Gap check"
        );

        Ok(GapCheckResult {
            stock_code: stock_code.to_string(),
            stock_name,
            days: window_days,
            has_gap: !gap_signals.is_empty(),
            gap_count: gap_signals.len(),
            gap_signals,
            price_change,
        })
    }

    // ── Listing ───────────────────────────────────────────────────────────────

    /// In-window gaps matching `filter`, largest |z| first, at most
    /// `filter.limit` entries.
    pub async fn list_gaps_filtered(&self, filter: &GapFilter) -> StoreResult<Vec<GapHistoryEntry>> {
        let query = GapQuery {
            news_date_from: self.window_from(filter.window_days),
            direction:      filter.direction,
            magnitude:      filter.magnitude.clone(),
            min_abs_z:      filter.min_abs_z,
        };

        let gaps = self.gaps.find_gap_signals_filtered(&query).await?;
        let matched = gaps.len();

        let entries: Vec<GapHistoryEntry> = gaps
            .iter()
            .take(filter.limit)
            .map(GapHistoryEntry::from)
            .collect();

        debug!(?filter, matched, returned = entries.len(), "gap listing");
        Ok(entries)
    }

    // ── Prices ────────────────────────────────────────────────────────────────

    /// Daily closes for one stock between two dates (inclusive), oldest first.
    pub async fn price_history(
        &self,
        stock_code: &str,
        date_from:  NaiveDate,
        date_to:    NaiveDate,
    ) -> StoreResult<Vec<PriceObservation>> {
        price_history(self.prices.as_ref(), stock_code, date_from, date_to).await
    }

    // ── Statistics ────────────────────────────────────────────────────────────

    /// Counts by direction and mean z-score over the window.
    pub async fn calculate_stats(&self, window_days: u32) -> StoreResult<GapStats> {
        let from = self.window_from(window_days);

        let (total_count, over_count, under_count, avg_z_score) = tokio::try_join!(
            self.gaps.count_gap_signals(from, None),
            self.gaps.count_gap_signals(from, Some(Direction::Over)),
            self.gaps.count_gap_signals(from, Some(Direction::Under)),
            self.gaps.average_z_score(from),
        )?;

        // An empty window has no average, whatever the store reported.
        let avg_z_score = if total_count == 0 { None } else { avg_z_score };

        Ok(GapStats { total_count, over_count, under_count, avg_z_score })
    }

    /// Totals plus per-direction, per-magnitude and per-event-code counts.
    pub async fn calculate_detailed_stats(&self, window_days: u32) -> StoreResult<GapStatisticsDetail> {
        let from = self.window_from(window_days);
        let breakdown = self.gaps.aggregate(from).await?;

        info!(
            window_days,
            total        = breakdown.total,
            by_direction = ?breakdown.by_direction,
            "📊 Detailed gap statistics"
        );

        Ok(GapStatisticsDetail { period_days: window_days, breakdown })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::engine::clock::FixedClock;
    use crate::engine::testing::{day, gap, price, today, with_magnitude};
    use crate::models::{GapBreakdown, GapSignal};
    use crate::store::memory::MemoryStore;
    use crate::store::StoreError;

    fn engine_over(gaps: Vec<GapSignal>, prices: Vec<PriceObservation>) -> GapEngine {
        let store = Arc::new(MemoryStore::with_records(gaps, prices));
        GapEngine::with_clock(store.clone(), store, Arc::new(FixedClock(today())))
    }

    fn three_signal_scenario() -> Vec<GapSignal> {
        vec![
            gap(1, "005930", day(2024, 6, 1), Some(Direction::Over), Some(3.0)),
            gap(2, "005930", day(2024, 6, 2), Some(Direction::Under), Some(-2.5)),
            gap(3, "000660", day(2024, 6, 3), None, Some(1.0)),
        ]
    }

    // ── check_gaps ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn check_with_no_signals_still_computes_price_change() {
        let engine = engine_over(
            vec![],
            vec![
                price("005930", day(2024, 4, 1), Some(100.0)),
                price("005930", day(2024, 6, 28), Some(110.0)),
            ],
        );

        let result = engine.check_gaps("005930", 100).await.unwrap();
        assert!(!result.has_gap);
        assert_eq!(result.gap_count, 0);
        assert!(result.gap_signals.is_empty());
        assert_eq!(result.stock_name, None);
        assert_eq!(result.days, 100);
        let change = result.price_change.expect("price change attempted");
        assert!((change - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn check_projects_in_window_signals_for_one_stock() {
        let mut old = gap(9, "005930", day(2023, 1, 1), Some(Direction::Over), Some(5.0));
        old.stock_name = Some("Stale".into());
        let mut undated = gap(10, "005930", day(2024, 6, 1), Some(Direction::Over), Some(5.0));
        undated.news_date = None;

        let mut signals = three_signal_scenario();
        signals.push(old);
        signals.push(undated);
        let engine = engine_over(signals, vec![]);

        let result = engine.check_gaps("005930", 100).await.unwrap();
        assert!(result.has_gap);
        assert_eq!(result.gap_count, 2);
        assert_eq!(result.stock_name.as_deref(), Some("Name 005930"));
        assert_eq!(result.price_change, None);

        let view = &result.gap_signals[1];
        assert_eq!(view.news_id, "news-2");
        assert_eq!(view.z_score, Some(-2.5));
        assert_eq!(view.direction, Some(Direction::Under));
        assert_eq!(view.actual_return, Some(1.5));
        assert_eq!(view.expected_return, None);
    }

    // ── list_gaps_filtered ────────────────────────────────────────────────────

    #[tokio::test]
    async fn listing_is_sorted_by_abs_z_and_truncated() {
        let engine = engine_over(
            vec![
                gap(1, "A", day(2024, 6, 1), Some(Direction::Over), Some(2.2)),
                gap(2, "B", day(2024, 6, 2), Some(Direction::Under), Some(-3.9)),
                gap(3, "C", day(2024, 6, 3), Some(Direction::Over), Some(5.1)),
                gap(4, "D", day(2024, 6, 4), Some(Direction::Under), Some(-2.0)),
                gap(5, "E", day(2024, 6, 5), Some(Direction::Over), Some(1.9)),
            ],
            vec![],
        );

        let all = engine.list_gaps_filtered(&GapFilter::default()).await.unwrap();
        let codes: Vec<&str> = all.iter().map(|e| e.stock_code.as_str()).collect();
        assert_eq!(codes, vec!["C", "B", "A", "D"]);
        for pair in all.windows(2) {
            let (a, b) = (pair[0].z_score.unwrap().abs(), pair[1].z_score.unwrap().abs());
            assert!(a >= b);
        }

        let limited = engine
            .list_gaps_filtered(&GapFilter { limit: 2, ..GapFilter::default() })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[..], all[..2]);

        let none = engine
            .list_gaps_filtered(&GapFilter { limit: 0, ..GapFilter::default() })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn listing_applies_direction_and_magnitude_filters() {
        let engine = engine_over(
            vec![
                with_magnitude(gap(1, "A", day(2024, 6, 1), Some(Direction::Over), Some(3.5)), "EXTREME"),
                with_magnitude(gap(2, "B", day(2024, 6, 2), Some(Direction::Over), Some(2.5)), "HIGH"),
                with_magnitude(gap(3, "C", day(2024, 6, 3), Some(Direction::Under), Some(-3.1)), "EXTREME"),
                with_magnitude(gap(4, "D", day(2020, 1, 1), Some(Direction::Over), Some(9.0)), "EXTREME"),
            ],
            vec![],
        );

        let over = engine
            .list_gaps_filtered(&GapFilter { direction: Some(Direction::Over), ..GapFilter::default() })
            .await
            .unwrap();
        assert_eq!(over.iter().map(|e| e.stock_code.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);

        let extreme = engine
            .list_gaps_filtered(&GapFilter {
                magnitude: Some(Magnitude::new("EXTREME")),
                ..GapFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(extreme.iter().map(|e| e.stock_code.as_str()).collect::<Vec<_>>(), vec!["A", "C"]);

        let strict = engine
            .list_gaps_filtered(&GapFilter { min_abs_z: 3.2, ..GapFilter::default() })
            .await
            .unwrap();
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].stock_code, "A");
    }

    // ── calculate_stats ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn simple_stats_count_law() {
        let engine = engine_over(three_signal_scenario(), vec![]);

        let stats = engine.calculate_stats(100).await.unwrap();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.over_count, 1);
        assert_eq!(stats.under_count, 1);
        assert!(stats.total_count >= stats.over_count + stats.under_count);
        let avg = stats.avg_z_score.unwrap();
        assert!((avg - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn simple_stats_on_empty_window_has_no_average() {
        let engine = engine_over(three_signal_scenario(), vec![]);

        // Every signal is older than a 7-day window ending on today().
        let stats = engine.calculate_stats(7).await.unwrap();
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.avg_z_score, None);
    }

    // ── calculate_detailed_stats ──────────────────────────────────────────────

    #[tokio::test]
    async fn detailed_stats_exclude_null_labels_from_partitions() {
        let engine = engine_over(three_signal_scenario(), vec![]);

        let detail = engine.calculate_detailed_stats(100).await.unwrap();
        let b = &detail.breakdown;
        assert_eq!(detail.period_days, 100);
        assert_eq!(b.total, 3);
        assert_eq!(b.by_direction.get("OVER"), Some(&1));
        assert_eq!(b.by_direction.get("UNDER"), Some(&1));
        assert_eq!(b.by_direction.len(), 2);
        assert_eq!(b.by_direction.values().sum::<u64>(), 2);
        assert!(b.by_magnitude.is_empty());
        assert_eq!(b.by_event_code.values().sum::<u64>(), 3);
    }

    #[tokio::test]
    async fn fully_labelled_window_partitions_sum_to_total() {
        let engine = engine_over(
            vec![
                with_magnitude(gap(1, "A", day(2024, 6, 1), Some(Direction::Over), Some(3.5)), "EXTREME"),
                with_magnitude(gap(2, "B", day(2024, 6, 10), Some(Direction::Under), Some(-2.2)), "HIGH"),
                with_magnitude(gap(3, "C", day(2024, 6, 20), Some(Direction::Over), Some(1.1)), "MODERATE"),
                with_magnitude(gap(4, "A", day(2024, 6, 29), Some(Direction::Under), Some(-3.0)), "EXTREME"),
            ],
            vec![],
        );

        let stats = engine.calculate_stats(100).await.unwrap();
        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.total_count, stats.over_count + stats.under_count);

        let b = engine.calculate_detailed_stats(100).await.unwrap().breakdown;
        assert_eq!(b.total, stats.total_count);
        assert_eq!(b.by_direction.values().sum::<u64>(), b.total);
        assert_eq!(b.by_magnitude.values().sum::<u64>(), b.total);
        assert_eq!(b.by_event_code.values().sum::<u64>(), b.total);
        assert_eq!(b.by_magnitude.get("EXTREME"), Some(&2));
    }

    #[tokio::test]
    async fn detailed_stats_skip_undated_and_out_of_window_signals() {
        let mut undated = gap(4, "A", day(2024, 6, 1), Some(Direction::Over), Some(4.0));
        undated.news_date = None;
        let old = gap(5, "A", day(2023, 1, 1), Some(Direction::Over), Some(4.0));

        let mut signals = three_signal_scenario();
        signals.push(undated);
        signals.push(old);
        let engine = engine_over(signals, vec![]);

        let detail = engine.calculate_detailed_stats(100).await.unwrap();
        assert_eq!(detail.breakdown.total, 3);
        assert_eq!(detail.breakdown.by_direction.get("OVER"), Some(&1));
    }

    #[tokio::test]
    async fn detailed_and_simple_stats_agree_on_the_window() {
        let engine = engine_over(three_signal_scenario(), vec![]);
        for window in [0, 7, 27, 28, 29, 100] {
            let simple = engine.calculate_stats(window).await.unwrap();
            let detail = engine.calculate_detailed_stats(window).await.unwrap();
            assert_eq!(simple.total_count, detail.breakdown.total, "window {window}");
        }
    }

    // ── Failure propagation ───────────────────────────────────────────────────

    struct BrokenStore;

    #[async_trait]
    impl GapRecordStore for BrokenStore {
        async fn find_gap_signals(&self, _: &str, _: NaiveDate) -> StoreResult<Vec<GapSignal>> {
            Err(StoreError::Backend("connection refused".into()))
        }
        async fn find_gap_signals_filtered(&self, _: &GapQuery) -> StoreResult<Vec<GapSignal>> {
            Err(StoreError::Backend("connection refused".into()))
        }
        async fn count_gap_signals(&self, _: NaiveDate, d: Option<Direction>) -> StoreResult<u64> {
            // Only the UNDER count fails, after the others have succeeded.
            match d {
                Some(Direction::Under) => Err(StoreError::Backend("timeout".into())),
                _ => Ok(1),
            }
        }
        async fn average_z_score(&self, _: NaiveDate) -> StoreResult<Option<f64>> {
            Ok(Some(1.0))
        }
        async fn find_all_gap_signals(&self) -> StoreResult<Vec<GapSignal>> {
            Err(StoreError::Malformed("direction 'SIDEWAYS'".into()))
        }
        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn store_failures_propagate_without_partial_results() {
        let prices = Arc::new(MemoryStore::new());
        let engine = GapEngine::with_clock(Arc::new(BrokenStore), prices, Arc::new(FixedClock(today())));

        assert!(matches!(engine.check_gaps("A", 100).await, Err(StoreError::Backend(_))));
        assert!(engine.list_gaps_filtered(&GapFilter::default()).await.is_err());
        assert!(engine.calculate_stats(7).await.is_err());
        assert!(matches!(
            engine.calculate_detailed_stats(100).await,
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn breakdown_partitions_are_independent() {
        let mut b = GapBreakdown::default();
        b.record(&with_magnitude(gap(1, "A", day(2024, 6, 1), None, Some(2.0)), "HIGH"));
        b.record(&gap(2, "A", day(2024, 6, 1), Some(Direction::Under), None));
        assert_eq!(b.total, 2);
        assert_eq!(b.by_direction.values().sum::<u64>(), 1);
        assert_eq!(b.by_magnitude.values().sum::<u64>(), 1);
        assert_eq!(b.by_event_code.get("EARNINGS"), Some(&2));
    }
}
