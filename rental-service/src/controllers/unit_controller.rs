use rental_client::{
    db::{
        bill_queries::{self, BillDetail},
        installed_utility_queries::{self, UnitUtility},
        Page, ReadQuery, TableGateway,
    },
    domain::{NewUnit, Unit},
};
use serde::Serialize;
use sqlx::SqlitePool;

use super::{rejected, validation, ControllerError, ValidationError};

/// Bills shown alongside a unit.
const RECENT_BILLS: i64 = 12;

/// Everything the unit "view" dialog shows.
#[derive(Debug, Clone, Serialize)]
pub struct UnitView {
    pub unit: Unit,
    pub utilities: Vec<UnitUtility>,
    pub recent_bills: Vec<BillDetail>,
}

#[derive(Clone)]
pub struct UnitController {
    units: TableGateway<Unit>,
}

impl UnitController {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            units: TableGateway::new(pool),
        }
    }

    pub async fn add_unit(&self, new: NewUnit) -> Result<Unit, ControllerError> {
        let new = validation::validate_unit(&new).map_err(rejected("unit"))?;
        let unit = self.units.create(&new).await?;
        tracing::info!(unit_id = unit.id, name = %unit.name, "unit added");
        Ok(unit)
    }

    pub async fn edit_unit(&self, id: i64, new: NewUnit) -> Result<Unit, ControllerError> {
        let new = validation::validate_unit(&new).map_err(rejected("unit"))?;
        let unit = self.units.update(id, &new).await?;
        tracing::info!(unit_id = id, "unit updated");
        Ok(unit)
    }

    /// Deleting a unit removes its installations and their bills. A unit that
    /// is the main unit of a shared utility is kept until the utility has
    /// another main unit.
    pub async fn delete_unit(&self, id: i64) -> Result<(), ControllerError> {
        let mut tx = self.units.pool().begin().await?;
        let shared = installed_utility_queries::shared_utilities_with_main_unit(&mut *tx, id).await?;
        if let Some(&utility_id) = shared.first() {
            return Err(rejected("unit")(ValidationError::UnitIsMainOfSharedUtility {
                unit_id: id,
                utility_id,
            }));
        }
        TableGateway::<Unit>::delete_with(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(unit_id = id, "unit deleted");
        Ok(())
    }

    pub async fn get_unit(&self, id: i64) -> Result<UnitView, ControllerError> {
        let unit = self.units.get(id).await?;
        let pool = self.units.pool();
        let utilities = installed_utility_queries::utilities_for_unit(pool, id).await?;
        let recent_bills = bill_queries::recent_bills_for_unit(pool, id, RECENT_BILLS).await?;

        Ok(UnitView {
            unit,
            utilities,
            recent_bills,
        })
    }

    pub async fn list_units(&self, query: &ReadQuery) -> Result<Page<Unit>, ControllerError> {
        Ok(self.units.read(query).await?)
    }
}
