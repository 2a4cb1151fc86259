//! [`Table`] descriptions of the id-keyed tables.

use super::table::{Insertable, SqlValue, Table};
use crate::domain::{Bill, NewBill, NewUnit, NewUtility, Unit, Utility};

impl Table for Unit {
    const NAME: &'static str = "unit";
    const COLUMNS: &'static [&'static str] = &["id", "name", "address", "unit_type"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "address", "unit_type"];
    const DEFAULT_SORT: &'static str = "name";

    type New = NewUnit;
}

impl Insertable for NewUnit {
    const COLUMNS: &'static [&'static str] = &["name", "address", "unit_type"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.name.clone().into(),
            self.address.clone().into(),
            self.unit_type.as_ref().into(),
        ]
    }
}

impl Table for Utility {
    const NAME: &'static str = "utility";
    const COLUMNS: &'static [&'static str] = &["id", "utility_type", "provider", "status", "billing_cycle"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["utility_type", "provider", "status", "billing_cycle"];

    type New = NewUtility;
}

impl Insertable for NewUtility {
    const COLUMNS: &'static [&'static str] = &["utility_type", "provider", "status", "billing_cycle"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.utility_type.as_ref().into(),
            self.provider.clone().into(),
            self.status.as_ref().into(),
            self.billing_cycle.as_ref().into(),
        ]
    }
}

impl Table for Bill {
    const NAME: &'static str = "bill";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "unit_id",
        "utility_id",
        "total_amount",
        "billing_period_start",
        "billing_period_end",
        "due_date",
        "status",
    ];
    const SEARCH_COLUMNS: &'static [&'static str] =
        &["status", "billing_period_start", "billing_period_end", "due_date"];
    const DEFAULT_SORT: &'static str = "due_date";

    type New = NewBill;
}

impl Insertable for NewBill {
    const COLUMNS: &'static [&'static str] = &[
        "unit_id",
        "utility_id",
        "total_amount",
        "billing_period_start",
        "billing_period_end",
        "due_date",
        "status",
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.unit_id.into(),
            self.utility_id.into(),
            self.total_amount.into(),
            self.billing_period_start.into(),
            self.billing_period_end.into(),
            self.due_date.into(),
            self.status.as_ref().into(),
        ]
    }
}
