use rental_client::{
    db::{installed_utility_queries as installs, Page, ReadQuery, TableGateway},
    domain::{InstalledUtility, NewInstallation, NewUtility, Unit, Utility},
    DbError,
};
use serde::Serialize;
use sqlx::{sqlite::SqliteConnection, SqlitePool};

use super::{rejected, validation, ControllerError, ValidationError};

/// A utility with the units it is installed on, main unit first.
#[derive(Debug, Clone, Serialize)]
pub struct UtilityView {
    pub utility: Utility,
    pub installations: Vec<InstalledUtility>,
}

impl UtilityView {
    pub fn main_unit_id(&self) -> Option<i64> {
        self.installations.iter().find(|i| i.is_main).map(|i| i.unit_id)
    }

    pub fn is_shared(&self) -> bool {
        self.installations.len() > 1
    }
}

#[derive(Clone)]
pub struct UtilityController {
    pool: SqlitePool,
    utilities: TableGateway<Utility>,
}

async fn ensure_unit_exists(conn: &mut SqliteConnection, unit_id: i64) -> Result<(), ControllerError> {
    if TableGateway::<Unit>::find_with(conn, unit_id).await?.is_none() {
        return Err(rejected("utility")(ValidationError::UnknownUnit(unit_id)));
    }
    Ok(())
}

impl UtilityController {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            utilities: TableGateway::new(pool.clone()),
            pool,
        }
    }

    /// Creates a utility together with its installations. With several units
    /// the utility is shared and `main_unit_id` names the unit its cost is
    /// attributed to.
    pub async fn add_utility(
        &self,
        new: NewUtility,
        installations: Vec<NewInstallation>,
        main_unit_id: Option<i64>,
    ) -> Result<UtilityView, ControllerError> {
        let new = validation::validate_utility(&new).map_err(rejected("utility"))?;
        let main_unit_id =
            validation::resolve_main_unit(&installations, main_unit_id).map_err(rejected("utility"))?;

        let mut tx = self.pool.begin().await?;
        for installation in &installations {
            ensure_unit_exists(&mut tx, installation.unit_id).await?;
        }

        let utility = TableGateway::<Utility>::insert_with(&mut *tx, &new).await?;
        for installation in &installations {
            installs::insert_installation(&mut *tx, utility.id, installation, installation.unit_id == main_unit_id)
                .await?;
        }
        let installations = installs::installations_for_utility(&mut *tx, utility.id).await?;
        tx.commit().await?;

        tracing::info!(
            utility_id = utility.id,
            units = installations.len(),
            main_unit_id,
            "utility added"
        );
        Ok(UtilityView {
            utility,
            installations,
        })
    }

    pub async fn edit_utility(&self, id: i64, new: NewUtility) -> Result<Utility, ControllerError> {
        let new = validation::validate_utility(&new).map_err(rejected("utility"))?;
        let utility = self.utilities.update(id, &new).await?;
        tracing::info!(utility_id = id, "utility updated");
        Ok(utility)
    }

    /// Deleting a utility removes its installations and their bills.
    pub async fn delete_utility(&self, id: i64) -> Result<(), ControllerError> {
        self.utilities.delete(id).await?;
        tracing::info!(utility_id = id, "utility deleted");
        Ok(())
    }

    /// Installs an existing utility on one more unit. The first installation
    /// of a utility becomes its main unit.
    pub async fn install(
        &self,
        utility_id: i64,
        installation: NewInstallation,
    ) -> Result<InstalledUtility, ControllerError> {
        let mut tx = self.pool.begin().await?;
        if TableGateway::<Utility>::find_with(&mut *tx, utility_id).await?.is_none() {
            return Err(DbError::NotFound {
                table: "utility",
                id: utility_id,
            }
            .into());
        }
        ensure_unit_exists(&mut tx, installation.unit_id).await?;

        if installs::find_installation(&mut *tx, installation.unit_id, utility_id)
            .await?
            .is_some()
        {
            return Err(rejected("utility")(ValidationError::AlreadyInstalled {
                unit_id: installation.unit_id,
                utility_id,
            }));
        }

        let is_main = installs::installation_count(&mut *tx, utility_id).await? == 0;
        let row = installs::insert_installation(&mut *tx, utility_id, &installation, is_main).await?;
        tx.commit().await?;

        tracing::info!(utility_id, unit_id = row.unit_id, is_main, "utility installed");
        Ok(row)
    }

    /// Removes a utility from a unit, together with the bills issued for that
    /// pair. The main unit of a shared utility cannot be removed until
    /// another unit is made main.
    pub async fn uninstall(&self, utility_id: i64, unit_id: i64) -> Result<(), ControllerError> {
        let mut tx = self.pool.begin().await?;
        let installation = installs::find_installation(&mut *tx, unit_id, utility_id)
            .await?
            .ok_or_else(|| rejected("utility")(ValidationError::NotInstalled { unit_id, utility_id }))?;

        if installation.is_main && installs::installation_count(&mut *tx, utility_id).await? > 1 {
            return Err(rejected("utility")(ValidationError::MainUnitInUse));
        }

        installs::delete_installation(&mut *tx, unit_id, utility_id).await?;
        tx.commit().await?;

        tracing::info!(utility_id, unit_id, "utility uninstalled");
        Ok(())
    }

    pub async fn set_main_unit(&self, utility_id: i64, unit_id: i64) -> Result<(), ControllerError> {
        let mut tx = self.pool.begin().await?;
        if installs::find_installation(&mut *tx, unit_id, utility_id).await?.is_none() {
            return Err(rejected("utility")(ValidationError::NotInstalled { unit_id, utility_id }));
        }
        installs::set_main_unit(&mut tx, utility_id, unit_id).await?;
        tx.commit().await?;

        tracing::info!(utility_id, unit_id, "main unit changed");
        Ok(())
    }

    pub async fn get_utility(&self, id: i64) -> Result<UtilityView, ControllerError> {
        let utility = self.utilities.get(id).await?;
        let installations = installs::installations_for_utility(&self.pool, id).await?;
        Ok(UtilityView {
            utility,
            installations,
        })
    }

    pub async fn list_utilities(&self, query: &ReadQuery) -> Result<Page<Utility>, ControllerError> {
        Ok(self.utilities.read(query).await?)
    }
}
