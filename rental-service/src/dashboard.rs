//! Home dashboard: reporting ranges and the composed overview.

use std::str::FromStr;

use rental_client::db::{
    bill_queries::BillDetail,
    dashboard_queries::{self, Bucket, PeriodTotal, StatusTotal, SummaryCounts, UnitTotal},
};
use serde::Serialize;
use sqlx::SqlitePool;
use time::{Date, Duration, Month};

use crate::controllers::{ControllerError, ValidationError};

/// Reporting window. Every variant resolves to a half-open `[start, end)`.
///
/// The rolling "last N months" windows include the current month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    #[default]
    ThisMonth,
    LastMonth,
    Last3Months,
    Last6Months,
    Last12Months,
    YearToDate,
    Custom { start: Date, end: Date },
}

impl FromStr for DateRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "this_month" => Ok(DateRange::ThisMonth),
            "last_month" => Ok(DateRange::LastMonth),
            "last_3_months" => Ok(DateRange::Last3Months),
            "last_6_months" => Ok(DateRange::Last6Months),
            "last_12_months" => Ok(DateRange::Last12Months),
            "year_to_date" => Ok(DateRange::YearToDate),
            other => Err(ValidationError::InvalidRange(format!("unknown range '{other}'"))),
        }
    }
}

fn month_start(date: Date) -> Date {
    date - Duration::days(i64::from(date.day()) - 1)
}

/// First day of the month `delta` months away from `first`'s month.
fn shift_months(first: Date, delta: i32) -> Result<Date, ValidationError> {
    let index = first.year() * 12 + i32::from(u8::from(first.month())) - 1 + delta;
    let (year, month0) = (index.div_euclid(12), index.rem_euclid(12));
    let out_of_range = || ValidationError::InvalidRange("date range is out of bounds".to_string());

    // month0 is within 0..12, so the conversion cannot fail.
    let month = Month::try_from(month0 as u8 + 1).map_err(|_| out_of_range())?;
    Date::from_calendar_date(year, month, 1).map_err(|_| out_of_range())
}

impl DateRange {
    pub fn bounds(self, today: Date) -> Result<(Date, Date), ValidationError> {
        let this_month = month_start(today);
        let next_month = shift_months(this_month, 1)?;

        let rolling = |months: i32| -> Result<(Date, Date), ValidationError> {
            Ok((shift_months(this_month, 1 - months)?, next_month))
        };

        match self {
            DateRange::ThisMonth => Ok((this_month, next_month)),
            DateRange::LastMonth => Ok((shift_months(this_month, -1)?, this_month)),
            DateRange::Last3Months => rolling(3),
            DateRange::Last6Months => rolling(6),
            DateRange::Last12Months => rolling(12),
            DateRange::YearToDate => {
                let jan_first = Date::from_calendar_date(today.year(), Month::January, 1)
                    .map_err(|e| ValidationError::InvalidRange(e.to_string()))?;
                let end = today
                    .next_day()
                    .ok_or_else(|| ValidationError::InvalidRange("date range is out of bounds".to_string()))?;
                Ok((jan_first, end))
            }
            DateRange::Custom { start, end } if end > start => Ok((start, end)),
            DateRange::Custom { .. } => Err(ValidationError::InvalidRange(
                "range end must be after range start".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeDashboard {
    pub range_start: Date,
    pub range_end: Date,
    pub counts: SummaryCounts,
    pub spending: Vec<PeriodTotal>,
    pub by_unit: Vec<UnitTotal>,
    pub by_status: Vec<StatusTotal>,
    pub upcoming: Vec<BillDetail>,
    pub overdue: Vec<BillDetail>,
}

#[derive(Clone)]
pub struct DashboardService {
    pool: SqlitePool,
    upcoming_horizon_days: i64,
}

impl DashboardService {
    pub fn new(pool: SqlitePool, upcoming_horizon_days: i64) -> Self {
        Self {
            pool,
            upcoming_horizon_days,
        }
    }

    pub async fn home(&self, today: Date, range: DateRange, bucket: Bucket) -> Result<HomeDashboard, ControllerError> {
        let (start, end) = range.bounds(today)?;
        let pool = &self.pool;

        let counts = dashboard_queries::summary_counts(pool).await?;
        let spending = dashboard_queries::spending_by_period(pool, start, end, bucket, None).await?;
        let by_unit = dashboard_queries::spending_by_unit(pool, start, end).await?;
        let by_status = dashboard_queries::status_breakdown(pool, start, end).await?;
        let upcoming = dashboard_queries::upcoming_bills(pool, today, self.upcoming_horizon_days).await?;
        let overdue = dashboard_queries::overdue_bills(pool, today).await?;

        tracing::debug!(%start, %end, ?bucket, "dashboard composed");
        Ok(HomeDashboard {
            range_start: start,
            range_end: end,
            counts,
            spending,
            by_unit,
            by_status,
            upcoming,
            overdue,
        })
    }

    /// Spending series for one unit.
    pub async fn unit_spending(
        &self,
        unit_id: i64,
        today: Date,
        range: DateRange,
        bucket: Bucket,
    ) -> Result<Vec<PeriodTotal>, ControllerError> {
        let (start, end) = range.bounds(today)?;
        Ok(dashboard_queries::spending_by_period(&self.pool, start, end, bucket, Some(unit_id)).await?)
    }
}
