use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use rental_client::{
    db::{bill_queries::BillDetail, Page},
    domain::{Bill, BillEdit, BillStatus, NewBill},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::{params::ListParams, ApiError, AppState};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bills).post(add_bill))
        .route("/mark_overdue", post(mark_overdue))
        .route("/:id", get(get_bill).put(edit_bill).delete(delete_bill))
        .route("/:id/status", put(set_status))
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: BillStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkOverdue {
    pub today: Option<Date>,
}

#[derive(Debug, Serialize)]
pub struct MarkOverdueResponse {
    pub marked: u64,
}

async fn list_bills(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Bill>>, ApiError> {
    let query = params.into_read_query(state.default_page_size);
    Ok(Json(state.bills.list_bills(&query).await?))
}

async fn add_bill(
    State(state): State<AppState>,
    Json(body): Json<NewBill>,
) -> Result<(StatusCode, Json<Bill>), ApiError> {
    let bill = state.bills.add_bill(body).await?;
    Ok((StatusCode::CREATED, Json(bill)))
}

async fn get_bill(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<BillDetail>, ApiError> {
    Ok(Json(state.bills.get_bill(id).await?))
}

async fn edit_bill(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<BillEdit>,
) -> Result<Json<Bill>, ApiError> {
    Ok(Json(state.bills.edit_bill(id, body).await?))
}

async fn delete_bill(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.bills.delete_bill(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<StatusChange>,
) -> Result<Json<BillDetail>, ApiError> {
    Ok(Json(state.bills.set_status(id, body.status).await?))
}

async fn mark_overdue(
    State(state): State<AppState>,
    Query(params): Query<MarkOverdue>,
) -> Result<Json<MarkOverdueResponse>, ApiError> {
    let today = params.today.unwrap_or_else(|| OffsetDateTime::now_utc().date());
    let marked = state.bills.mark_overdue(today).await?;
    Ok(Json(MarkOverdueResponse { marked }))
}
