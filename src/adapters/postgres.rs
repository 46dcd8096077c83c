//! PostgreSQL ledger: volatility snapshots, trade log, hourly exposure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use super::Ledger;
use crate::domain::{VolEstimate, VolSnapshot};
use crate::error::Result;
use crate::strategy::exposure::HourExposure;

/// One row of the trade log, capturing the full model context alongside
/// the order outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub asset: String,
    pub ticker: String,
    pub side: String,
    pub contracts: u32,
    pub limit_cents: u32,
    pub model_prob: f64,
    pub market_prob: f64,
    pub edge_pct: f64,
    pub kelly_fraction: f64,
    pub stake: Decimal,
    pub bankroll: Decimal,
    pub spot_price: Decimal,
    pub scaled_vol_pct: f64,
    pub settlement_time: DateTime<Utc>,
    pub order_id: Option<String>,
    pub order_status: String,
    pub dry_run: bool,
}

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Record one window estimate; the collector writes these every minute.
    pub async fn insert_vol_estimate(
        &self,
        asset: &str,
        taken_at: DateTime<Utc>,
        estimate: &VolEstimate,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO volatility_snapshots (asset, taken_at, window_minutes, std_pct, samples)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (asset, taken_at, window_minutes) DO UPDATE SET
                std_pct = EXCLUDED.std_pct,
                samples = EXCLUDED.samples
            "#,
        )
        .bind(asset)
        .bind(taken_at)
        .bind(estimate.window_minutes as i32)
        .bind(estimate.std_pct)
        .bind(estimate.samples as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Ledger for PostgresStore {
    async fn latest_vol_snapshot(&self, asset: &str) -> Result<Option<VolSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT taken_at, window_minutes, std_pct, samples
            FROM volatility_snapshots
            WHERE asset = $1
              AND taken_at = (
                  SELECT MAX(taken_at) FROM volatility_snapshots WHERE asset = $1
              )
            ORDER BY window_minutes
            "#,
        )
        .bind(asset)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let taken_at: DateTime<Utc> = rows[0].get("taken_at");
        let estimates = rows
            .iter()
            .map(|r| VolEstimate {
                window_minutes: r.get::<i32, _>("window_minutes") as u32,
                std_pct: r.get("std_pct"),
                samples: r.get::<i32, _>("samples") as u32,
            })
            .collect();

        Ok(Some(VolSnapshot {
            asset: asset.to_string(),
            taken_at,
            estimates,
        }))
    }

    async fn hour_exposure(&self, settlement_hour: DateTime<Utc>) -> Result<HourExposure> {
        let rows = sqlx::query(
            r#"
            SELECT asset, fraction
            FROM hour_exposure
            WHERE settlement_hour = $1
            "#,
        )
        .bind(settlement_hour)
        .fetch_all(&self.pool)
        .await?;

        let mut exposure = HourExposure::empty(settlement_hour);
        for row in rows {
            let asset: String = row.get("asset");
            let fraction: f64 = row.get("fraction");
            exposure.commit(&asset, fraction);
        }
        debug!(
            %settlement_hour,
            total = exposure.total(),
            "loaded hour exposure"
        );
        Ok(exposure)
    }

    async fn commit_exposure(
        &self,
        settlement_hour: DateTime<Utc>,
        asset: &str,
        fraction: f64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO hour_exposure (settlement_hour, asset, fraction, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (settlement_hour, asset) DO UPDATE SET
                fraction = hour_exposure.fraction + EXCLUDED.fraction,
                updated_at = NOW()
            "#,
        )
        .bind(settlement_hour)
        .bind(asset)
        .bind(fraction)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn log_trade(&self, entry: &TradeLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trade_log (
                asset, ticker, side, contracts, limit_cents,
                model_prob, market_prob, edge_pct, kelly_fraction,
                stake, bankroll, spot_price, scaled_vol_pct,
                settlement_time, order_id, order_status, dry_run, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, NOW())
            "#,
        )
        .bind(&entry.asset)
        .bind(&entry.ticker)
        .bind(&entry.side)
        .bind(entry.contracts as i32)
        .bind(entry.limit_cents as i32)
        .bind(entry.model_prob)
        .bind(entry.market_prob)
        .bind(entry.edge_pct)
        .bind(entry.kelly_fraction)
        .bind(entry.stake)
        .bind(entry.bankroll)
        .bind(entry.spot_price)
        .bind(entry.scaled_vol_pct)
        .bind(entry.settlement_time)
        .bind(&entry.order_id)
        .bind(&entry.order_status)
        .bind(entry.dry_run)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
