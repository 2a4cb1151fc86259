//! Validation and orchestration between the surfaces (HTTP, CLI, import)
//! and the database layer.

pub mod bill_controller;
pub mod unit_controller;
pub mod utility_controller;
pub mod validation;

pub use bill_controller::{BatchOutcome, BillController};
pub use unit_controller::{UnitController, UnitView};
pub use utility_controller::{UtilityController, UtilityView};
pub use validation::ValidationError;

use rental_client::DbError;

#[derive(thiserror::Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for ControllerError {
    fn from(e: sqlx::Error) -> Self {
        ControllerError::Db(DbError::Sqlx(e))
    }
}

impl ControllerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ControllerError::Db(e) if e.is_not_found())
    }
}

/// Counts a validation failure and turns it into a controller error.
pub(crate) fn rejected(entity: &'static str) -> impl Fn(ValidationError) -> ControllerError {
    move |err| {
        metrics::counter!("validation_rejected_total", "entity" => entity).increment(1);
        tracing::debug!(entity, error = %err, "input rejected");
        ControllerError::Validation(err)
    }
}
