use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, sqlx::Type)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UtilityType {
    Electricity,
    Water,
    Gas,
    Internet,
    Sewer,
    Trash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, sqlx::Type)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UtilityStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, sqlx::Type)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Bimonthly,
    Quarterly,
    Annually,
}

/// A metered or billed service (electricity, water, ...) installed on one or
/// more units.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Utility {
    pub id: i64,
    pub utility_type: UtilityType,
    pub provider: String,
    pub status: UtilityStatus,
    pub billing_cycle: BillingCycle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewUtility {
    pub utility_type: UtilityType,
    pub provider: String,
    pub status: UtilityStatus,
    pub billing_cycle: BillingCycle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_snake_case_names() {
        assert_eq!(UtilityType::Electricity.to_string(), "electricity");
        assert_eq!("bimonthly".parse::<BillingCycle>().unwrap(), BillingCycle::Bimonthly);
        assert!("Electricity ".parse::<UtilityType>().is_err());
    }
}
