//! # routes::gaps
//!
//! Gap query endpoints.
//!
//! | Method | Path                            | Query                                        | Response              |
//! |--------|---------------------------------|----------------------------------------------|-----------------------|
//! | GET    | `/api/gaps/check/:stock_code`   | `days`=100                                   | `GapCheckResult`      |
//! | GET    | `/api/gaps/list`                | `days`=100, `direction`, `magnitude`, `minZ`=2.0, `limit`=100 | `GapListResponse` |
//! | GET    | `/api/gaps/stats`               | `days`=100                                   | `GapStatisticsDetail` |
//! | GET    | `/api/gaps/stats/simple`        | `days`=7                                     | `GapStats`            |
//!
//! "No gaps" is a normal answer: it comes back as `200` with zero counts
//! and empty lists, never as a `404`.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    engine::GapFilter,
    error::AppError,
    models::{Direction, GapCheckResult, GapListResponse, GapStatisticsDetail, GapStats, Magnitude},
    state::SharedState,
};

const DEFAULT_DAYS:        u32 = 100;
const DEFAULT_SIMPLE_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub struct WindowParams {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub days:      Option<u32>,
    pub direction: Option<String>,
    pub magnitude: Option<String>,
    #[serde(rename = "minZ")]
    pub min_z:     Option<f64>,
    pub limit:     Option<usize>,
}

impl ListParams {
    fn into_filter(self) -> Result<GapFilter, AppError> {
        // `?direction=` with no value means "any".
        let direction = non_empty(self.direction)
            .map(|d| d.parse::<Direction>())
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let min_abs_z = self.min_z.unwrap_or(GapFilter::DEFAULT_MIN_ABS_Z);
        if !min_abs_z.is_finite() {
            return Err(AppError::BadRequest("minZ must be a finite number".into()));
        }

        Ok(GapFilter {
            window_days: self.days.unwrap_or(GapFilter::DEFAULT_WINDOW_DAYS),
            direction,
            magnitude:   non_empty(self.magnitude).map(Magnitude::new),
            min_abs_z,
            limit:       self.limit.unwrap_or(GapFilter::DEFAULT_LIMIT),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ─── GET /api/gaps/check/:stock_code ──────────────────────────────────────────

pub async fn check_gaps(
    State(state): State<SharedState>,
    Path(stock_code): Path<String>,
    params: Result<Query<WindowParams>, QueryRejection>,
) -> Result<Json<GapCheckResult>, AppError> {
    let Query(params) = params?;
    let days = params.days.unwrap_or(DEFAULT_DAYS);

    let result = state.engine.check_gaps(&stock_code, days).await?;
    Ok(Json(result))
}

// ─── GET /api/gaps/list ───────────────────────────────────────────────────────

pub async fn list_gaps(
    State(state): State<SharedState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<GapListResponse>, AppError> {
    let Query(params) = params?;
    let filter = params.into_filter()?;

    let gaps = state.engine.list_gaps_filtered(&filter).await?;
    Ok(Json(GapListResponse { gaps }))
}

// ─── GET /api/gaps/stats ──────────────────────────────────────────────────────

pub async fn detailed_stats(
    State(state): State<SharedState>,
    params: Result<Query<WindowParams>, QueryRejection>,
) -> Result<Json<GapStatisticsDetail>, AppError> {
    let Query(params) = params?;
    let days = params.days.unwrap_or(DEFAULT_DAYS);

    let stats = state.engine.calculate_detailed_stats(days).await?;
    Ok(Json(stats))
}

// ─── GET /api/gaps/stats/simple ───────────────────────────────────────────────

pub async fn simple_stats(
    State(state): State<SharedState>,
    params: Result<Query<WindowParams>, QueryRejection>,
) -> Result<Json<GapStats>, AppError> {
    let Query(params) = params?;
    let days = params.days.unwrap_or(DEFAULT_SIMPLE_DAYS);

    let stats = state.engine.calculate_stats(days).await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(direction: Option<&str>, min_z: Option<f64>) -> ListParams {
        ListParams {
            days:      None,
            direction: direction.map(str::to_string),
            magnitude: Some(String::new()),
            min_z,
            limit:     None,
        }
    }

    #[test]
    fn list_defaults_match_published_contract() {
        let filter = params(None, None).into_filter().unwrap();
        assert_eq!(filter, GapFilter::default());
    }

    #[test]
    fn blank_direction_means_any() {
        let filter = params(Some(""), None).into_filter().unwrap();
        assert_eq!(filter.direction, None);
    }

    #[test]
    fn unknown_direction_is_bad_request() {
        let err = params(Some("SIDEWAYS"), None).into_filter().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn non_finite_min_z_is_bad_request() {
        assert!(params(None, Some(f64::NAN)).into_filter().is_err());
    }
}
