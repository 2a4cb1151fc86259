use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use rental_client::db::dashboard_queries::Bucket;
use time::{Date, OffsetDateTime};

use super::{params::RangeParams, ApiError, AppState};
use crate::dashboard::{DateRange, HomeDashboard};

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/", get(home))
}

/// Turns the range query string into a reference date, range and bucket.
pub(super) fn resolve_range(params: RangeParams) -> Result<(Date, DateRange, Bucket), ApiError> {
    let today = params.today.unwrap_or_else(|| OffsetDateTime::now_utc().date());

    let range = match (params.range.as_deref(), params.start, params.end) {
        (Some("custom") | None, Some(start), Some(end)) => DateRange::Custom { start, end },
        (Some("custom"), _, _) => {
            return Err(ApiError::BadRequest("a custom range needs both start and end".to_string()))
        }
        (Some(name), _, _) => name.parse::<DateRange>()?,
        (None, _, _) => DateRange::default(),
    };

    let bucket = match params.bucket.as_deref() {
        Some(name) => name.parse::<Bucket>().map_err(ApiError::BadRequest)?,
        None => Bucket::default(),
    };

    Ok((today, range, bucket))
}

async fn home(State(state): State<AppState>, Query(params): Query<RangeParams>) -> Result<Json<HomeDashboard>, ApiError> {
    let (today, range, bucket) = resolve_range(params)?;
    Ok(Json(state.dashboard.home(today, range, bucket).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn start_and_end_imply_a_custom_range() {
        let (_, range, bucket) = resolve_range(RangeParams {
            start: Some(date!(2024 - 01 - 01)),
            end: Some(date!(2024 - 07 - 01)),
            bucket: Some("quarter".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            range,
            DateRange::Custom {
                start: date!(2024 - 01 - 01),
                end: date!(2024 - 07 - 01)
            }
        );
        assert_eq!(bucket, Bucket::Quarter);
    }

    #[test]
    fn incomplete_custom_range_is_a_bad_request() {
        let err = resolve_range(RangeParams {
            range: Some("custom".to_string()),
            start: Some(date!(2024 - 01 - 01)),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn unknown_preset_is_a_validation_error() {
        let err = resolve_range(RangeParams {
            range: Some("fortnight".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
