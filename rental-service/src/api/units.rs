use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rental_client::{
    db::{dashboard_queries::PeriodTotal, Page},
    domain::{NewUnit, Unit},
};

use super::{
    dashboard::resolve_range,
    params::{ListParams, RangeParams},
    ApiError, AppState,
};
use crate::controllers::UnitView;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_units).post(add_unit))
        .route("/:id", get(get_unit).put(edit_unit).delete(delete_unit))
        .route("/:id/spending", get(unit_spending))
}

async fn list_units(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Unit>>, ApiError> {
    let query = params.into_read_query(state.default_page_size);
    Ok(Json(state.units.list_units(&query).await?))
}

async fn add_unit(
    State(state): State<AppState>,
    Json(body): Json<NewUnit>,
) -> Result<(StatusCode, Json<Unit>), ApiError> {
    let unit = state.units.add_unit(body).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

async fn get_unit(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<UnitView>, ApiError> {
    Ok(Json(state.units.get_unit(id).await?))
}

async fn edit_unit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<NewUnit>,
) -> Result<Json<Unit>, ApiError> {
    Ok(Json(state.units.edit_unit(id, body).await?))
}

async fn delete_unit(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.units.delete_unit(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unit_spending(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<PeriodTotal>>, ApiError> {
    // 404 for unknown units instead of an empty series
    state.units.get_unit(id).await?;
    let (today, range, bucket) = resolve_range(params)?;
    Ok(Json(state.dashboard.unit_spending(id, today, range, bucket).await?))
}
