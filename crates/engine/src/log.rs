use sqlx::SqlitePool;

use common::{Result, SignalEvent};

/// Append-only signal log backed by SQLite.
///
/// The engine is the single writer; every append is one whole-row insert,
/// so concurrent readers never observe a partial record. A failed append is
/// reported to the caller, who logs it and moves on — a lost row must not
/// stall the engine.
#[derive(Clone)]
pub struct SignalLog {
    pub(crate) pool: SqlitePool,
}

impl SignalLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the signals table if this is the first run against the
    /// database. Idempotent; prior rows are never rewritten.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signals (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                symbol      TEXT NOT NULL,
                timeframe   TEXT NOT NULL,
                direction   TEXT NOT NULL,
                price       REAL NOT NULL,
                ema_short   REAL NOT NULL,
                ema_long    REAL NOT NULL,
                rsi         REAL NOT NULL,
                macd        REAL NOT NULL,
                macd_signal REAL NOT NULL,
                volume      REAL NOT NULL,
                vol_avg     REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn append(&self, event: &SignalEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO signals
                (timestamp, symbol, timeframe, direction, price,
                 ema_short, ema_long, rsi, macd, macd_signal, volume, vol_avg)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(event.timestamp.to_rfc3339())
        .bind(&event.symbol)
        .bind(event.timeframe.to_string())
        .bind(event.direction.to_string())
        .bind(event.price)
        .bind(event.ema_short)
        .bind(event.ema_long)
        .bind(event.rsi)
        .bind(event.macd)
        .bind(event.macd_signal)
        .bind(event.volume)
        .bind(event.vol_avg)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
