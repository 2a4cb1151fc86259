#![allow(dead_code)]

use rental_client::{
    db,
    domain::{BillStatus, BillingCycle, Money, NewBill, NewInstallation, NewUnit, NewUtility, UnitType, UtilityStatus, UtilityType},
};
use sqlx::SqlitePool;
use time::{macros::date, Date};

pub async fn memory_pool() -> SqlitePool {
    let pool = db::connect("sqlite::memory:", 1).await.unwrap();
    db::apply_schema(&pool).await.unwrap();
    pool
}

pub fn new_unit(name: &str) -> NewUnit {
    NewUnit {
        name: name.to_string(),
        address: format!("{name} Main St"),
        unit_type: UnitType::Apartment,
    }
}

pub fn new_utility(utility_type: UtilityType, provider: &str) -> NewUtility {
    NewUtility {
        utility_type,
        provider: provider.to_string(),
        status: UtilityStatus::Active,
        billing_cycle: BillingCycle::Monthly,
    }
}

pub fn installed_on(unit_id: i64) -> NewInstallation {
    NewInstallation {
        unit_id,
        installation_date: date!(2023 - 06 - 01),
    }
}

pub fn bill(unit_id: i64, utility_id: i64, cents: i64, period_start: Date) -> NewBill {
    let period_end = period_start + time::Duration::days(27);
    NewBill {
        unit_id,
        utility_id,
        total_amount: Money::from_cents(cents),
        billing_period_start: period_start,
        billing_period_end: period_end,
        due_date: period_end + time::Duration::days(14),
        status: BillStatus::Unpaid,
    }
}
