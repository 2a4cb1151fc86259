use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::DbError;

/// DDL for the four tables, applied in order. Every statement is idempotent.
///
/// Dates are stored as `YYYY-MM-DD` text so that lexical comparison matches
/// calendar order; amounts are integer cents.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS unit (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL,
        address     TEXT    NOT NULL,
        unit_type   TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS utility (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        utility_type    TEXT    NOT NULL,
        provider        TEXT    NOT NULL,
        status          TEXT    NOT NULL,
        billing_cycle   TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS installedutility (
        unit_id             INTEGER NOT NULL REFERENCES unit (id) ON DELETE CASCADE,
        utility_id          INTEGER NOT NULL REFERENCES utility (id) ON DELETE CASCADE,
        installation_date   TEXT    NOT NULL,
        is_main             INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (unit_id, utility_id)
    )
    "#,
    // One main unit per shared utility.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS installedutility_main_unit
        ON installedutility (utility_id) WHERE is_main = 1
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bill (
        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
        unit_id                 INTEGER NOT NULL,
        utility_id              INTEGER NOT NULL,
        total_amount            INTEGER NOT NULL
            CHECK (total_amount >= 0 AND total_amount < 10000000000),
        billing_period_start    TEXT    NOT NULL,
        billing_period_end      TEXT    NOT NULL,
        due_date                TEXT    NOT NULL,
        status                  TEXT    NOT NULL,
        FOREIGN KEY (unit_id, utility_id)
            REFERENCES installedutility (unit_id, utility_id) ON DELETE CASCADE,
        CHECK (billing_period_end > billing_period_start),
        CHECK (due_date > billing_period_end)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS bill_due_date ON bill (due_date)",
    "CREATE INDEX IF NOT EXISTS bill_period_start ON bill (billing_period_start)",
];

/// Open a pool against `url` with foreign keys enforced.
///
/// In-memory databases live and die with a single connection, so they are
/// always opened with one pooled connection that is never recycled.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = url.contains(":memory:") || url.contains("mode=memory");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    Ok(pool_options.connect_with(options).await?)
}

pub async fn apply_schema(pool: &SqlitePool) -> Result<(), DbError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
