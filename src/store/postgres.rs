//! # store::postgres — PostgreSQL Record Store
//!
//! Uses `sqlx` for async PostgreSQL access (runtime-checked queries, so the
//! crate builds without a live database).
//!
//! ## Setup
//! 1. Create the database the ingestion pipeline writes into
//! 2. Set `DATABASE_URL` in `.env`
//! 3. Run with `cargo run --features postgres` (the schema in
//!    `migrations/001_init.sql` is applied idempotently at startup)

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, types::BigDecimal, PgPool};
use tracing::info;

use crate::models::{Direction, GapBreakdown, GapSignal, Magnitude, PriceObservation};
use crate::store::{GapQuery, GapRecordStore, PriceSeriesStore, StoreError, StoreResult};

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => StoreError::Malformed(err.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

// ─── Pool Init ────────────────────────────────────────────────────────────────

/// Creates the pool and applies the schema.
pub async fn init_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    run_migrations(&pool).await?;

    info!("✅ PostgreSQL connected and migrations applied");
    Ok(pool)
}

async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::raw_sql(include_str!("../../migrations/001_init.sql"))
        .execute(pool)
        .await
        .context("Failed to run migration 001_init.sql")?;

    Ok(())
}

// ─── Rows ─────────────────────────────────────────────────────────────────────

const GAP_COLUMNS: &str = r#"
    id, news_id, news_title, stock_code, stock_name, event_code, news_date,
    horizon, actual_return, expected_return, expected_std, z_score,
    direction, magnitude, sample_count, detected_at
"#;

/// Direction filter bound at `$2`. Labels are compared the way
/// [`Direction`]'s `FromStr` reads them, so counts, listings and the
/// grouped breakdown agree on mixed-case rows.
const DIRECTION_FILTER: &str = "($2::text IS NULL OR UPPER(TRIM(direction)) = $2)";

#[derive(sqlx::FromRow)]
struct GapRow {
    id:              i64,
    news_id:         String,
    news_title:      Option<String>,
    stock_code:      String,
    stock_name:      Option<String>,
    event_code:      String,
    news_date:       Option<NaiveDate>,
    horizon:         i32,
    actual_return:   Option<BigDecimal>,
    expected_return: Option<BigDecimal>,
    expected_std:    Option<BigDecimal>,
    z_score:         Option<BigDecimal>,
    direction:       Option<String>,
    magnitude:       Option<String>,
    sample_count:    Option<i32>,
    detected_at:     DateTime<Utc>,
}

impl TryFrom<GapRow> for GapSignal {
    type Error = StoreError;

    fn try_from(row: GapRow) -> Result<Self, Self::Error> {
        let direction = parse_direction(row.direction.as_deref(), row.id)?;

        Ok(GapSignal {
            id:              row.id,
            news_id:         row.news_id,
            news_title:      row.news_title,
            stock_code:      row.stock_code,
            stock_name:      row.stock_name,
            event_code:      row.event_code,
            news_date:       row.news_date,
            horizon:         row.horizon,
            actual_return:   row.actual_return,
            expected_return: row.expected_return,
            expected_std:    row.expected_std,
            z_score:         row.z_score,
            direction,
            magnitude:       row.magnitude.map(Magnitude::new),
            sample_count:    row.sample_count,
            detected_at:     row.detected_at,
        })
    }
}

fn parse_direction(label: Option<&str>, id: i64) -> StoreResult<Option<Direction>> {
    label
        .map(|l| l.parse::<Direction>())
        .transpose()
        .map_err(|e| StoreError::Malformed(format!("news_gaps.id={id}: {e}")))
}

fn into_signals(rows: Vec<GapRow>) -> StoreResult<Vec<GapSignal>> {
    rows.into_iter().map(GapSignal::try_from).collect()
}

#[derive(sqlx::FromRow)]
struct PriceRow {
    stock_code:  String,
    trade_date:  NaiveDate,
    stock_name:  Option<String>,
    close_price: Option<BigDecimal>,
}

impl From<PriceRow> for PriceObservation {
    fn from(row: PriceRow) -> Self {
        PriceObservation {
            stock_code:    row.stock_code,
            trade_date:    row.trade_date,
            stock_name:    row.stock_name,
            closing_price: row.close_price,
        }
    }
}

// ─── Store ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn grouped(&self, column: &str, news_date_from: NaiveDate) -> StoreResult<Vec<(String, i64)>> {
        let sql = format!(
            "SELECT {column}, COUNT(*) FROM news_gaps \
             WHERE news_date >= $1 AND {column} IS NOT NULL \
             GROUP BY {column}"
        );
        Ok(sqlx::query_as::<_, (String, i64)>(&sql)
            .bind(news_date_from)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl GapRecordStore for PgStore {
    async fn find_gap_signals(
        &self,
        stock_code:     &str,
        news_date_from: NaiveDate,
    ) -> StoreResult<Vec<GapSignal>> {
        let sql = format!("SELECT {GAP_COLUMNS} FROM news_gaps WHERE stock_code = $1 AND news_date >= $2");
        let rows = sqlx::query_as::<_, GapRow>(&sql)
            .bind(stock_code)
            .bind(news_date_from)
            .fetch_all(&self.pool)
            .await?;
        into_signals(rows)
    }

    async fn find_gap_signals_filtered(&self, query: &GapQuery) -> StoreResult<Vec<GapSignal>> {
        let sql = format!(
            r#"
            SELECT {GAP_COLUMNS}
            FROM news_gaps
            WHERE news_date >= $1
              AND {DIRECTION_FILTER}
              AND ($3::text IS NULL OR magnitude = $3)
              AND ABS(z_score) >= $4::float8
            ORDER BY ABS(z_score) DESC
            "#
        );
        let rows = sqlx::query_as::<_, GapRow>(&sql)
            .bind(query.news_date_from)
            .bind(query.direction.map(|d| d.as_str()))
            .bind(query.magnitude.as_ref().map(|m| m.as_str().to_string()))
            .bind(query.min_abs_z)
            .fetch_all(&self.pool)
            .await?;
        into_signals(rows)
    }

    async fn count_gap_signals(
        &self,
        news_date_from: NaiveDate,
        direction:      Option<Direction>,
    ) -> StoreResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM news_gaps WHERE news_date >= $1 AND {DIRECTION_FILTER}");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(news_date_from)
            .bind(direction.map(|d| d.as_str()))
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn average_z_score(&self, news_date_from: NaiveDate) -> StoreResult<Option<f64>> {
        let avg: Option<f64> =
            sqlx::query_scalar("SELECT AVG(z_score)::float8 FROM news_gaps WHERE news_date >= $1")
                .bind(news_date_from)
                .fetch_one(&self.pool)
                .await?;
        Ok(avg)
    }

    async fn find_all_gap_signals(&self) -> StoreResult<Vec<GapSignal>> {
        let sql = format!("SELECT {GAP_COLUMNS} FROM news_gaps");
        let rows = sqlx::query_as::<_, GapRow>(&sql).fetch_all(&self.pool).await?;
        into_signals(rows)
    }

    /// Server-side `GROUP BY` instead of the full-scan default.
    async fn aggregate(&self, news_date_from: NaiveDate) -> StoreResult<GapBreakdown> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_gaps WHERE news_date >= $1")
            .bind(news_date_from)
            .fetch_one(&self.pool)
            .await?;

        let mut breakdown = GapBreakdown { total: total.max(0) as u64, ..GapBreakdown::default() };

        for (label, count) in self.grouped("direction", news_date_from).await? {
            // Normalise through the enum so keys match the in-memory path.
            let direction = label
                .parse::<Direction>()
                .map_err(|e| StoreError::Malformed(e.to_string()))?;
            *breakdown.by_direction.entry(direction.to_string()).or_default() += count.max(0) as u64;
        }
        for (label, count) in self.grouped("magnitude", news_date_from).await? {
            breakdown.by_magnitude.insert(label, count.max(0) as u64);
        }
        for (label, count) in self.grouped("event_code", news_date_from).await? {
            breakdown.by_event_code.insert(label, count.max(0) as u64);
        }

        Ok(breakdown)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl PriceSeriesStore for PgStore {
    async fn find_price_observation(
        &self,
        stock_code: &str,
        date:       NaiveDate,
    ) -> StoreResult<Option<PriceObservation>> {
        let row = sqlx::query_as::<_, PriceRow>(
            "SELECT stock_code, trade_date, stock_name, close_price \
             FROM stock_daily_prices WHERE stock_code = $1 AND trade_date = $2",
        )
        .bind(stock_code)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PriceObservation::from))
    }

    async fn find_price_observations(
        &self,
        stock_code: &str,
        date_from:  NaiveDate,
        date_to:    NaiveDate,
    ) -> StoreResult<Vec<PriceObservation>> {
        let rows = sqlx::query_as::<_, PriceRow>(
            "SELECT stock_code, trade_date, stock_name, close_price \
             FROM stock_daily_prices WHERE stock_code = $1 AND trade_date BETWEEN $2 AND $3",
        )
        .bind(stock_code)
        .bind(date_from)
        .bind(date_to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PriceObservation::from).collect())
    }
}
