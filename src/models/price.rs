//! # models::price
//!
//! [`PriceObservation`] — one stock's closing price on one trading day,
//! keyed by `(stock_code, trade_date)`. Written by the price-ingestion job,
//! read-only here.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::gap::decimal_to_f64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub stock_code: String,
    pub trade_date: NaiveDate,
    #[serde(default)]
    pub stock_name: Option<String>,
    /// Nullable in practice: the feed occasionally stores a row with no close.
    #[serde(default)]
    pub closing_price: Option<BigDecimal>,
}

impl PriceObservation {
    /// Closing price as a float, `None` when the row carries no price.
    #[inline]
    pub fn close_f64(&self) -> Option<f64> {
        decimal_to_f64(self.closing_price.as_ref())
    }
}

/// Wire shape of one row on the price endpoint, camelCase like the
/// dashboard's other price feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceView {
    pub stock_code:    String,
    pub date:          NaiveDate,
    pub stock_name:    Option<String>,
    pub closing_price: Option<f64>,
}

impl From<&PriceObservation> for PriceView {
    fn from(row: &PriceObservation) -> Self {
        Self {
            stock_code:    row.stock_code.clone(),
            date:          row.trade_date,
            stock_name:    row.stock_name.clone(),
            closing_price: row.close_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_uses_camel_case_keys() {
        let row = PriceObservation {
            stock_code:    "005930".into(),
            trade_date:    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            stock_name:    Some("Samsung".into()),
            closing_price: Some("78500.00".parse().unwrap()),
        };
        let json = serde_json::to_value(PriceView::from(&row)).unwrap();
        assert_eq!(json["stockCode"], "005930");
        assert_eq!(json["date"], "2024-01-02");
        assert_eq!(json["stockName"], "Samsung");
        assert_eq!(json["closingPrice"], 78500.0);
    }
}
