//! Fixture builders shared by the unit tests.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, TimeZone, Utc};

use crate::models::{Direction, GapSignal, Magnitude, PriceObservation};

/// Anchor date for every fixed-clock test.
pub fn today() -> NaiveDate {
    day(2024, 6, 30)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dec(v: f64) -> BigDecimal {
    v.to_string().parse().unwrap()
}

pub fn gap(id: i64, code: &str, news_date: NaiveDate, direction: Option<Direction>, z: Option<f64>) -> GapSignal {
    GapSignal {
        id,
        news_id:         format!("news-{id}"),
        news_title:      Some(format!("Headline {id}")),
        stock_code:      code.to_string(),
        stock_name:      Some(format!("Name {code}")),
        event_code:      "EARNINGS".to_string(),
        news_date:       Some(news_date),
        horizon:         5,
        actual_return:   Some(dec(1.5)),
        expected_return: None,
        expected_std:    Some(dec(0.8)),
        z_score:         z.map(dec),
        direction,
        magnitude:       None,
        sample_count:    Some(42),
        detected_at:     Utc.with_ymd_and_hms(2024, 6, 30, 9, 0, 0).unwrap(),
    }
}

pub fn with_magnitude(mut gap: GapSignal, label: &str) -> GapSignal {
    gap.magnitude = Some(Magnitude::new(label));
    gap
}

pub fn price(code: &str, trade_date: NaiveDate, close: Option<f64>) -> PriceObservation {
    PriceObservation {
        stock_code:    code.to_string(),
        trade_date,
        stock_name:    Some(format!("Name {code}")),
        closing_price: close.map(dec),
    }
}
