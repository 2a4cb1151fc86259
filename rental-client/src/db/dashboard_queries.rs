//! Range and bucketing queries behind the home dashboard.
//!
//! Ranges are half-open: a bill belongs to `[start, end)` when its
//! `billing_period_start` falls inside it.

use std::str::FromStr;

use sqlx::sqlite::SqlitePool;
use time::{Date, Duration};

use super::bill_queries::{BillDetail, BILL_DETAIL_SELECT};
use crate::{
    domain::{BillStatus, Money, UtilityStatus, UtilityType},
    error::DbError,
};

/// Longest look-ahead for upcoming bills, in days.
pub const MAX_HORIZON_DAYS: i64 = 3650;

/// Granularity of a spending series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Bucket {
    #[default]
    Month,
    Quarter,
    Year,
}

impl Bucket {
    /// SQL expression labelling `column` with its bucket: `2024-03`,
    /// `2024-Q1`, `2024`.
    fn sql_expr(self, column: &str) -> String {
        match self {
            Bucket::Month => format!("strftime('%Y-%m', {column})"),
            Bucket::Quarter => format!(
                "strftime('%Y', {column}) || '-Q' || ((CAST(strftime('%m', {column}) AS INTEGER) + 2) / 3)"
            ),
            Bucket::Year => format!("strftime('%Y', {column})"),
        }
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "month" => Ok(Bucket::Month),
            "quarter" => Ok(Bucket::Quarter),
            "year" => Ok(Bucket::Year),
            other => Err(format!("unknown bucket '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PeriodTotal {
    pub period: String,
    pub utility_type: UtilityType,
    pub total: Money,
    pub bill_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UnitTotal {
    pub unit_id: i64,
    pub unit_name: String,
    pub total: Money,
    pub bill_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StatusTotal {
    pub status: BillStatus,
    pub total: Money,
    pub bill_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SummaryCounts {
    pub units: i64,
    pub utilities: i64,
    pub active_utilities: i64,
    pub shared_utilities: i64,
    pub open_bills: i64,
    pub outstanding: Money,
}

/// Spending per bucket and utility type.
pub async fn spending_by_period(
    pool: &SqlitePool,
    start: Date,
    end: Date,
    bucket: Bucket,
    unit_id: Option<i64>,
) -> Result<Vec<PeriodTotal>, DbError> {
    let unit_clause = if unit_id.is_some() { "AND b.unit_id = ?" } else { "" };
    let sql = format!(
        r#"
        SELECT
            {period} AS period,
            ut.utility_type AS utility_type,
            COALESCE(SUM(b.total_amount), 0) AS total,
            COUNT(*) AS bill_count
        FROM bill b
        JOIN utility ut ON ut.id = b.utility_id
        WHERE b.billing_period_start >= ?
          AND b.billing_period_start <  ?
          {unit_clause}
        GROUP BY period, ut.utility_type
        ORDER BY period, ut.utility_type
        "#,
        period = bucket.sql_expr("b.billing_period_start"),
    );

    let mut query = sqlx::query_as::<_, PeriodTotal>(&sql).bind(start).bind(end);
    if let Some(unit_id) = unit_id {
        query = query.bind(unit_id);
    }

    Ok(query.fetch_all(pool).await?)
}

/// Spending per unit, including units without bills in the range.
pub async fn spending_by_unit(pool: &SqlitePool, start: Date, end: Date) -> Result<Vec<UnitTotal>, DbError> {
    let rows = sqlx::query_as::<_, UnitTotal>(
        r#"
        SELECT
            u.id AS unit_id,
            u.name AS unit_name,
            COALESCE(SUM(b.total_amount), 0) AS total,
            COUNT(b.id) AS bill_count
        FROM unit u
        LEFT JOIN bill b
          ON b.unit_id = u.id
         AND b.billing_period_start >= ?
         AND b.billing_period_start <  ?
        GROUP BY u.id, u.name
        ORDER BY total DESC, u.name
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn status_breakdown(pool: &SqlitePool, start: Date, end: Date) -> Result<Vec<StatusTotal>, DbError> {
    let rows = sqlx::query_as::<_, StatusTotal>(
        r#"
        SELECT
            status AS status,
            COALESCE(SUM(total_amount), 0) AS total,
            COUNT(*) AS bill_count
        FROM bill
        WHERE billing_period_start >= ?
          AND billing_period_start <  ?
        GROUP BY status
        ORDER BY status
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Unpaid bills due between `today` and `today + horizon_days`, inclusive.
/// The horizon is clamped to `0..=MAX_HORIZON_DAYS`.
pub async fn upcoming_bills(pool: &SqlitePool, today: Date, horizon_days: i64) -> Result<Vec<BillDetail>, DbError> {
    let until = today
        .checked_add(Duration::days(horizon_days.clamp(0, MAX_HORIZON_DAYS)))
        .unwrap_or(Date::MAX);
    let sql = format!(
        "{BILL_DETAIL_SELECT} WHERE b.status = ? AND b.due_date >= ? AND b.due_date <= ? ORDER BY b.due_date, b.id"
    );

    let rows = sqlx::query_as::<_, BillDetail>(&sql)
        .bind(BillStatus::Unpaid)
        .bind(today)
        .bind(until)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Bills not yet paid whose due date has passed.
pub async fn overdue_bills(pool: &SqlitePool, today: Date) -> Result<Vec<BillDetail>, DbError> {
    let sql = format!("{BILL_DETAIL_SELECT} WHERE b.status != ? AND b.due_date < ? ORDER BY b.due_date, b.id");

    let rows = sqlx::query_as::<_, BillDetail>(&sql)
        .bind(BillStatus::Paid)
        .bind(today)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Flags unpaid bills past their due date as overdue. Returns the number of
/// bills changed.
pub async fn mark_overdue(pool: &SqlitePool, today: Date) -> Result<u64, DbError> {
    let result = sqlx::query("UPDATE bill SET status = ? WHERE status = ? AND due_date < ?")
        .bind(BillStatus::Overdue)
        .bind(BillStatus::Unpaid)
        .bind(today)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn summary_counts(pool: &SqlitePool) -> Result<SummaryCounts, DbError> {
    let row = sqlx::query_as::<_, SummaryCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM unit) AS units,
            (SELECT COUNT(*) FROM utility) AS utilities,
            (SELECT COUNT(*) FROM utility WHERE status = ?) AS active_utilities,
            (SELECT COUNT(*) FROM (
                SELECT utility_id FROM installedutility GROUP BY utility_id HAVING COUNT(*) > 1
            )) AS shared_utilities,
            (SELECT COUNT(*) FROM bill WHERE status != ?) AS open_bills,
            (SELECT COALESCE(SUM(total_amount), 0) FROM bill WHERE status != ?) AS outstanding
        "#,
    )
    .bind(UtilityStatus::Active)
    .bind(BillStatus::Paid)
    .bind(BillStatus::Paid)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
