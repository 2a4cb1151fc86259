use sqlx::{sqlite::Sqlite, Executor};
use time::Date;

use crate::{
    domain::{BillStatus, Money, UtilityType},
    error::DbError,
};

/// A bill joined with the names a reader needs to recognise it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BillDetail {
    pub id: i64,
    pub unit_id: i64,
    pub unit_name: String,
    pub utility_id: i64,
    pub utility_type: UtilityType,
    pub provider: String,
    pub total_amount: Money,
    pub billing_period_start: Date,
    pub billing_period_end: Date,
    pub due_date: Date,
    pub status: BillStatus,
}

pub(crate) const BILL_DETAIL_SELECT: &str = r#"
    SELECT
        b.id AS id,
        b.unit_id AS unit_id,
        u.name AS unit_name,
        b.utility_id AS utility_id,
        ut.utility_type AS utility_type,
        ut.provider AS provider,
        b.total_amount AS total_amount,
        b.billing_period_start AS billing_period_start,
        b.billing_period_end AS billing_period_end,
        b.due_date AS due_date,
        b.status AS status
    FROM bill b
    JOIN unit u ON u.id = b.unit_id
    JOIN utility ut ON ut.id = b.utility_id
"#;

pub async fn bill_detail<'c, E>(executor: E, bill_id: i64) -> Result<BillDetail, DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("{BILL_DETAIL_SELECT} WHERE b.id = ?");
    sqlx::query_as::<_, BillDetail>(&sql)
        .bind(bill_id)
        .fetch_optional(executor)
        .await?
        .ok_or(DbError::NotFound {
            table: "bill",
            id: bill_id,
        })
}

/// Most recent bills of one unit, newest billing period first.
pub async fn recent_bills_for_unit<'c, E>(executor: E, unit_id: i64, limit: i64) -> Result<Vec<BillDetail>, DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("{BILL_DETAIL_SELECT} WHERE b.unit_id = ? ORDER BY b.billing_period_start DESC, b.id DESC LIMIT ?");
    let rows = sqlx::query_as::<_, BillDetail>(&sql)
        .bind(unit_id)
        .bind(limit)
        .fetch_all(executor)
        .await?;

    Ok(rows)
}

pub async fn set_status<'c, E>(executor: E, bill_id: i64, status: BillStatus) -> Result<(), DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE bill SET status = ? WHERE id = ?")
        .bind(status)
        .bind(bill_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            table: "bill",
            id: bill_id,
        });
    }
    Ok(())
}
