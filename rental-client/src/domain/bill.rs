use strum::{AsRefStr, Display, EnumString};
use time::Date;

use super::Money;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, sqlx::Type,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BillStatus {
    #[default]
    Unpaid,
    Paid,
    Overdue,
}

/// A periodic charge for a utility at a unit.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bill {
    pub id: i64,
    pub unit_id: i64,
    pub utility_id: i64,
    pub total_amount: Money,
    pub billing_period_start: Date,
    pub billing_period_end: Date,
    pub due_date: Date,
    pub status: BillStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewBill {
    pub unit_id: i64,
    pub utility_id: i64,
    pub total_amount: Money,
    pub billing_period_start: Date,
    pub billing_period_end: Date,
    pub due_date: Date,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: BillStatus,
}

/// Replacement fields for an existing bill. Without a status the stored one
/// is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BillEdit {
    pub unit_id: i64,
    pub utility_id: i64,
    pub total_amount: Money,
    pub billing_period_start: Date,
    pub billing_period_end: Date,
    pub due_date: Date,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: Option<BillStatus>,
}

impl BillEdit {
    pub fn into_new_bill(self, current: BillStatus) -> NewBill {
        NewBill {
            unit_id: self.unit_id,
            utility_id: self.utility_id,
            total_amount: self.total_amount,
            billing_period_start: self.billing_period_start,
            billing_period_end: self.billing_period_end,
            due_date: self.due_date,
            status: self.status.unwrap_or(current),
        }
    }
}
