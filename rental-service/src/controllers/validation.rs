//! Field-level validation. These checks need no database access; the
//! controllers layer the relational checks (existence, installation, main
//! unit) on top.

use std::collections::HashSet;

use rental_client::domain::{Money, NewBill, NewInstallation, NewUnit, NewUtility};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_ADDRESS_LEN: usize = 255;
pub const MAX_PROVIDER_LEN: usize = 100;
/// Bill amounts must stay strictly below this.
pub const AMOUNT_LIMIT: Money = Money::from_units(100_000_000);

/// A rejected input. `Display` is the message shown to the user.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    #[error("{field} cannot be longer than {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("Total Amount cannot be negative")]
    NegativeAmount,
    #[error("Total Amount must be less than 100,000,000")]
    AmountTooLarge,
    #[error("Billing Period End must be after Billing Period Start")]
    PeriodEndNotAfterStart,
    #[error("Due Date must be after Billing Period End")]
    DueDateNotAfterPeriodEnd,
    #[error("Unit {0} does not exist")]
    UnknownUnit(i64),
    #[error("Utility {utility_id} is not installed on unit {unit_id}")]
    NotInstalled { unit_id: i64, utility_id: i64 },
    #[error("Utility {utility_id} is already installed on unit {unit_id}")]
    AlreadyInstalled { unit_id: i64, utility_id: i64 },
    #[error("Bills for shared utility {utility_id} must be issued to its main unit {main_unit_id}")]
    NotMainUnit { utility_id: i64, main_unit_id: i64 },
    #[error("A utility must be installed on at least one unit")]
    NoUnits,
    #[error("Unit {0} is listed more than once")]
    DuplicateUnit(i64),
    #[error("A main unit is required when a utility is installed on several units")]
    MainUnitRequired,
    #[error("Main unit {0} is not one of the units the utility is installed on")]
    MainUnitNotInstalled(i64),
    #[error("Cannot uninstall the main unit of a shared utility; choose another main unit first")]
    MainUnitInUse,
    #[error("Unit {unit_id} is the main unit of shared utility {utility_id}; choose another main unit first")]
    UnitIsMainOfSharedUtility { unit_id: i64, utility_id: i64 },
    #[error("{0}")]
    InvalidRange(String),
}

fn required_text(value: &str, field: &'static str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Returns the unit with surrounding whitespace removed.
pub fn validate_unit(unit: &NewUnit) -> Result<NewUnit, ValidationError> {
    Ok(NewUnit {
        name: required_text(&unit.name, "Unit Name", MAX_NAME_LEN)?,
        address: required_text(&unit.address, "Address", MAX_ADDRESS_LEN)?,
        unit_type: unit.unit_type,
    })
}

pub fn validate_utility(utility: &NewUtility) -> Result<NewUtility, ValidationError> {
    Ok(NewUtility {
        provider: required_text(&utility.provider, "Provider", MAX_PROVIDER_LEN)?,
        ..utility.clone()
    })
}

pub fn validate_amount(amount: Money) -> Result<(), ValidationError> {
    if amount.is_negative() {
        return Err(ValidationError::NegativeAmount);
    }
    if amount >= AMOUNT_LIMIT {
        return Err(ValidationError::AmountTooLarge);
    }
    Ok(())
}

pub fn validate_bill_fields(bill: &NewBill) -> Result<(), ValidationError> {
    validate_amount(bill.total_amount)?;
    if bill.billing_period_end <= bill.billing_period_start {
        return Err(ValidationError::PeriodEndNotAfterStart);
    }
    if bill.due_date <= bill.billing_period_end {
        return Err(ValidationError::DueDateNotAfterPeriodEnd);
    }
    Ok(())
}

/// Checks the unit list of a new utility and resolves its main unit.
///
/// A single installation is its own main unit; several need an explicit main
/// unit drawn from the list.
pub fn resolve_main_unit(installations: &[NewInstallation], main_unit_id: Option<i64>) -> Result<i64, ValidationError> {
    let mut seen = HashSet::new();
    for installation in installations {
        if !seen.insert(installation.unit_id) {
            return Err(ValidationError::DuplicateUnit(installation.unit_id));
        }
    }

    match (installations, main_unit_id) {
        ([], _) => Err(ValidationError::NoUnits),
        ([only], None) => Ok(only.unit_id),
        (_, None) => Err(ValidationError::MainUnitRequired),
        (_, Some(main)) if seen.contains(&main) => Ok(main),
        (_, Some(main)) => Err(ValidationError::MainUnitNotInstalled(main)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_client::domain::{BillStatus, BillingCycle, UnitType, UtilityStatus, UtilityType};
    use time::macros::date;

    fn bill() -> NewBill {
        NewBill {
            unit_id: 1,
            utility_id: 1,
            total_amount: Money::from_cents(12_345),
            billing_period_start: date!(2024 - 01 - 01),
            billing_period_end: date!(2024 - 01 - 31),
            due_date: date!(2024 - 02 - 15),
            status: BillStatus::Unpaid,
        }
    }

    fn installation(unit_id: i64) -> NewInstallation {
        NewInstallation {
            unit_id,
            installation_date: date!(2023 - 05 - 01),
        }
    }

    #[test]
    fn accepts_a_well_formed_bill() {
        assert_eq!(validate_bill_fields(&bill()), Ok(()));
    }

    #[test]
    fn rejects_negative_amount_with_user_message() {
        let mut b = bill();
        b.total_amount = Money::from_cents(-1);
        let err = validate_bill_fields(&b).unwrap_err();
        assert_eq!(err.to_string(), "Total Amount cannot be negative");
    }

    #[test]
    fn amount_bounds_are_half_open() {
        assert!(validate_amount(Money::ZERO).is_ok());
        assert!(validate_amount(Money::from_cents(AMOUNT_LIMIT.cents() - 1)).is_ok());
        assert_eq!(validate_amount(AMOUNT_LIMIT), Err(ValidationError::AmountTooLarge));
    }

    #[test]
    fn rejects_period_end_on_or_before_start() {
        let mut b = bill();
        b.billing_period_end = b.billing_period_start;
        assert_eq!(validate_bill_fields(&b), Err(ValidationError::PeriodEndNotAfterStart));

        b.billing_period_end = date!(2023 - 12 - 31);
        assert_eq!(validate_bill_fields(&b), Err(ValidationError::PeriodEndNotAfterStart));
    }

    #[test]
    fn rejects_due_date_not_after_period_end() {
        let mut b = bill();
        b.due_date = b.billing_period_end;
        let err = validate_bill_fields(&b).unwrap_err();
        assert_eq!(err.to_string(), "Due Date must be after Billing Period End");
    }

    #[test]
    fn unit_text_is_trimmed_and_required() {
        let unit = validate_unit(&NewUnit {
            name: "  4B ".to_string(),
            address: " 1 Elm St".to_string(),
            unit_type: UnitType::Apartment,
        })
        .unwrap();
        assert_eq!(unit.name, "4B");
        assert_eq!(unit.address, "1 Elm St");

        let err = validate_unit(&NewUnit {
            name: "   ".to_string(),
            address: "x".to_string(),
            unit_type: UnitType::House,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Unit Name cannot be empty");
    }

    #[test]
    fn overlong_provider_is_rejected() {
        let err = validate_utility(&NewUtility {
            utility_type: UtilityType::Gas,
            provider: "x".repeat(MAX_PROVIDER_LEN + 1),
            status: UtilityStatus::Active,
            billing_cycle: BillingCycle::Monthly,
        })
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "Provider",
                max: MAX_PROVIDER_LEN
            }
        );
    }

    #[test]
    fn single_installation_is_its_own_main_unit() {
        assert_eq!(resolve_main_unit(&[installation(7)], None), Ok(7));
    }

    #[test]
    fn shared_installation_needs_a_listed_main_unit() {
        let installs = [installation(1), installation(2)];
        assert_eq!(resolve_main_unit(&installs, None), Err(ValidationError::MainUnitRequired));
        assert_eq!(resolve_main_unit(&installs, Some(3)), Err(ValidationError::MainUnitNotInstalled(3)));
        assert_eq!(resolve_main_unit(&installs, Some(2)), Ok(2));
    }

    #[test]
    fn installation_list_must_be_non_empty_and_unique() {
        assert_eq!(resolve_main_unit(&[], Some(1)), Err(ValidationError::NoUnits));
        assert_eq!(
            resolve_main_unit(&[installation(1), installation(1)], Some(1)),
            Err(ValidationError::DuplicateUnit(1))
        );
    }
}
