//! # routes::prices
//!
//! `GET /api/prices/:stock_code?startDate=yyyyMMdd&endDate=yyyyMMdd` — raw
//! daily closes for a date range, oldest first. Both bounds are inclusive.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{error::AppError, models::PriceView, state::SharedState};

const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    #[serde(rename = "startDate")]
    pub start: String,
    #[serde(rename = "endDate")]
    pub end:   String,
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::BadRequest(format!("{field} must be a yyyyMMdd date, got '{raw}'")))
}

pub async fn price_range(
    State(state): State<SharedState>,
    Path(stock_code): Path<String>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<Vec<PriceView>>, AppError> {
    let Query(params) = params?;
    let start = parse_date("startDate", &params.start)?;
    let end   = parse_date("endDate", &params.end)?;

    if start > end {
        return Err(AppError::BadRequest(format!("start {start} is after end {end}")));
    }

    let rows = state.engine.price_history(&stock_code, start, end).await?;
    Ok(Json(rows.iter().map(PriceView::from).collect()))
}
