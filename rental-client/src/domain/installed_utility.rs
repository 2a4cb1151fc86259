use time::Date;

/// Row of the `installedutility` join table.
///
/// A utility installed on several units is shared; exactly one of its rows
/// carries `is_main`, and the cost of the utility is attributed to that unit.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstalledUtility {
    pub unit_id: i64,
    pub utility_id: i64,
    pub installation_date: Date,
    pub is_main: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewInstallation {
    pub unit_id: i64,
    pub installation_date: Date,
}
