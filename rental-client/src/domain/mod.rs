pub mod bill;
pub mod installed_utility;
pub mod money;
pub mod unit;
pub mod utility;

pub use bill::{Bill, BillEdit, BillStatus, NewBill};
pub use installed_utility::{InstalledUtility, NewInstallation};
pub use money::{Money, MoneyParseError};
pub use unit::{NewUnit, Unit, UnitType};
pub use utility::{BillingCycle, NewUtility, Utility, UtilityStatus, UtilityType};
