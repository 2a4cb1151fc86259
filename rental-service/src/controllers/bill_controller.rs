use rental_client::{
    db::{
        bill_queries::{self, BillDetail},
        dashboard_queries,
        installed_utility_queries as installs,
        Page, ReadQuery, TableGateway,
    },
    domain::{Bill, BillEdit, BillStatus, NewBill},
    DbError,
};
use sqlx::{sqlite::SqliteConnection, SqlitePool};
use time::Date;

use super::{rejected, validation, ControllerError, ValidationError};

/// Result of a batch insert. Rejected rows carry their index in the input.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub inserted: Vec<Bill>,
    pub rejected: Vec<(usize, ValidationError)>,
}

#[derive(Clone)]
pub struct BillController {
    pool: SqlitePool,
    bills: TableGateway<Bill>,
}

/// A bill may only be issued for a utility installed on its unit, and for a
/// shared utility only to the main unit.
async fn check_billable(conn: &mut SqliteConnection, bill: &NewBill) -> Result<(), ControllerError> {
    let installation = installs::find_installation(&mut *conn, bill.unit_id, bill.utility_id)
        .await?
        .ok_or_else(|| {
            rejected("bill")(ValidationError::NotInstalled {
                unit_id: bill.unit_id,
                utility_id: bill.utility_id,
            })
        })?;

    if !installation.is_main {
        let main_unit_id = installs::installations_for_utility(&mut *conn, bill.utility_id)
            .await?
            .into_iter()
            .find(|i| i.is_main)
            .map(|i| i.unit_id)
            .unwrap_or(installation.unit_id);
        return Err(rejected("bill")(ValidationError::NotMainUnit {
            utility_id: bill.utility_id,
            main_unit_id,
        }));
    }

    Ok(())
}

impl BillController {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            bills: TableGateway::new(pool.clone()),
            pool,
        }
    }

    pub async fn add_bill(&self, new: NewBill) -> Result<Bill, ControllerError> {
        validation::validate_bill_fields(&new).map_err(rejected("bill"))?;

        let mut tx = self.pool.begin().await?;
        check_billable(&mut tx, &new).await?;
        let bill = TableGateway::<Bill>::insert_with(&mut *tx, &new).await?;
        tx.commit().await?;

        metrics::counter!("bills_created_total").increment(1);
        tracing::info!(
            bill_id = bill.id,
            unit_id = bill.unit_id,
            utility_id = bill.utility_id,
            amount = %bill.total_amount,
            "bill added"
        );
        Ok(bill)
    }

    /// Inserts every valid bill of `bills` in one transaction. Invalid rows
    /// are reported and skipped; a database failure rolls back the batch.
    pub async fn add_bills(&self, bills: &[NewBill]) -> Result<BatchOutcome, ControllerError> {
        let mut outcome = BatchOutcome::default();
        let mut tx = self.pool.begin().await?;

        for (index, bill) in bills.iter().enumerate() {
            let checked = match validation::validate_bill_fields(bill).map_err(rejected("bill")) {
                Ok(()) => check_billable(&mut tx, bill).await,
                Err(err) => Err(err),
            };
            match checked {
                Ok(()) => {}
                Err(ControllerError::Validation(err)) => {
                    outcome.rejected.push((index, err));
                    continue;
                }
                Err(err) => return Err(err),
            }
            outcome.inserted.push(TableGateway::<Bill>::insert_with(&mut *tx, bill).await?);
        }

        tx.commit().await?;

        metrics::counter!("bills_created_total").increment(outcome.inserted.len() as u64);
        tracing::info!(
            inserted = outcome.inserted.len(),
            rejected = outcome.rejected.len(),
            "bill batch stored"
        );
        Ok(outcome)
    }

    /// Replaces the fields of bill `id`. A missing status keeps the stored one.
    pub async fn edit_bill(&self, id: i64, edit: BillEdit) -> Result<Bill, ControllerError> {
        let mut tx = self.pool.begin().await?;
        let current = TableGateway::<Bill>::find_with(&mut *tx, id)
            .await?
            .ok_or(DbError::NotFound { table: "bill", id })?;

        let new = edit.into_new_bill(current.status);
        validation::validate_bill_fields(&new).map_err(rejected("bill"))?;
        check_billable(&mut tx, &new).await?;
        let bill = TableGateway::<Bill>::update_with(&mut *tx, id, &new).await?;
        tx.commit().await?;

        tracing::info!(bill_id = id, "bill updated");
        Ok(bill)
    }

    pub async fn set_status(&self, id: i64, status: BillStatus) -> Result<BillDetail, ControllerError> {
        bill_queries::set_status(&self.pool, id, status).await?;
        tracing::info!(bill_id = id, %status, "bill status changed");
        Ok(bill_queries::bill_detail(&self.pool, id).await?)
    }

    pub async fn delete_bill(&self, id: i64) -> Result<(), ControllerError> {
        self.bills.delete(id).await?;
        tracing::info!(bill_id = id, "bill deleted");
        Ok(())
    }

    pub async fn get_bill(&self, id: i64) -> Result<BillDetail, ControllerError> {
        Ok(bill_queries::bill_detail(&self.pool, id).await?)
    }

    pub async fn list_bills(&self, query: &ReadQuery) -> Result<Page<Bill>, ControllerError> {
        Ok(self.bills.read(query).await?)
    }

    /// Flags unpaid bills due before `today` as overdue.
    pub async fn mark_overdue(&self, today: Date) -> Result<u64, ControllerError> {
        let changed = dashboard_queries::mark_overdue(&self.pool, today).await?;
        if changed > 0 {
            metrics::counter!("bills_marked_overdue_total").increment(changed);
            tracing::info!(changed, %today, "bills marked overdue");
        }
        Ok(changed)
    }
}
