use sqlx::{
    sqlite::{Sqlite, SqliteConnection},
    Executor,
};
use time::Date;

use crate::{
    domain::{BillingCycle, InstalledUtility, NewInstallation, UtilityStatus, UtilityType},
    error::DbError,
};

/// A utility as seen from one unit, with how many units share it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UnitUtility {
    pub utility_id: i64,
    pub utility_type: UtilityType,
    pub provider: String,
    pub status: UtilityStatus,
    pub billing_cycle: BillingCycle,
    pub installation_date: Date,
    pub is_main: bool,
    pub unit_count: i64,
}

impl UnitUtility {
    pub fn is_shared(&self) -> bool {
        self.unit_count > 1
    }
}

pub async fn insert_installation<'c, E>(
    executor: E,
    utility_id: i64,
    installation: &NewInstallation,
    is_main: bool,
) -> Result<InstalledUtility, DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, InstalledUtility>(
        r#"
        INSERT INTO installedutility (unit_id, utility_id, installation_date, is_main)
        VALUES (?, ?, ?, ?)
        RETURNING unit_id, utility_id, installation_date, is_main
        "#,
    )
    .bind(installation.unit_id)
    .bind(utility_id)
    .bind(installation.installation_date)
    .bind(is_main)
    .fetch_one(executor)
    .await?;

    Ok(row)
}

pub async fn find_installation<'c, E>(
    executor: E,
    unit_id: i64,
    utility_id: i64,
) -> Result<Option<InstalledUtility>, DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, InstalledUtility>(
        r#"
        SELECT unit_id, utility_id, installation_date, is_main
        FROM installedutility
        WHERE unit_id = ? AND utility_id = ?
        "#,
    )
    .bind(unit_id)
    .bind(utility_id)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// All installations of a utility, main unit first.
pub async fn installations_for_utility<'c, E>(
    executor: E,
    utility_id: i64,
) -> Result<Vec<InstalledUtility>, DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, InstalledUtility>(
        r#"
        SELECT unit_id, utility_id, installation_date, is_main
        FROM installedutility
        WHERE utility_id = ?
        ORDER BY is_main DESC, unit_id
        "#,
    )
    .bind(utility_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

pub async fn utilities_for_unit<'c, E>(executor: E, unit_id: i64) -> Result<Vec<UnitUtility>, DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, UnitUtility>(
        r#"
        SELECT
            ut.id AS utility_id,
            ut.utility_type AS utility_type,
            ut.provider AS provider,
            ut.status AS status,
            ut.billing_cycle AS billing_cycle,
            iu.installation_date AS installation_date,
            iu.is_main AS is_main,
            (SELECT COUNT(*) FROM installedutility s WHERE s.utility_id = iu.utility_id) AS unit_count
        FROM installedutility iu
        JOIN utility ut ON ut.id = iu.utility_id
        WHERE iu.unit_id = ?
        ORDER BY ut.utility_type, ut.id
        "#,
    )
    .bind(unit_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

pub async fn installation_count<'c, E>(executor: E, utility_id: i64) -> Result<i64, DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM installedutility WHERE utility_id = ?")
        .bind(utility_id)
        .fetch_one(executor)
        .await?;

    Ok(count)
}

/// Shared utilities whose main unit is `unit_id`.
pub async fn shared_utilities_with_main_unit<'c, E>(executor: E, unit_id: i64) -> Result<Vec<i64>, DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT iu.utility_id
        FROM installedutility iu
        WHERE iu.unit_id = ?
          AND iu.is_main = 1
          AND (SELECT COUNT(*) FROM installedutility s WHERE s.utility_id = iu.utility_id) > 1
        ORDER BY iu.utility_id
        "#,
    )
    .bind(unit_id)
    .fetch_all(executor)
    .await?;

    Ok(ids)
}

/// Removes one installation; its bills go with it through the cascade.
/// Returns whether a row was deleted.
pub async fn delete_installation<'c, E>(executor: E, unit_id: i64, utility_id: i64) -> Result<bool, DbError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM installedutility WHERE unit_id = ? AND utility_id = ?")
        .bind(unit_id)
        .bind(utility_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Moves the main-unit flag of `utility_id` to `unit_id`.
///
/// The old flag is cleared before the new one is set so the partial unique
/// index never sees two main rows. Run it inside a transaction.
pub async fn set_main_unit(conn: &mut SqliteConnection, utility_id: i64, unit_id: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE installedutility SET is_main = 0 WHERE utility_id = ? AND is_main = 1")
        .bind(utility_id)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("UPDATE installedutility SET is_main = 1 WHERE utility_id = ? AND unit_id = ?")
        .bind(utility_id)
        .bind(unit_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            table: "installedutility",
            id: unit_id,
        });
    }
    Ok(())
}
