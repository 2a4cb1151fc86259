use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use rental_client::{
    db::Page,
    domain::{InstalledUtility, NewInstallation, NewUtility, Utility},
};
use serde::Deserialize;

use super::{params::ListParams, ApiError, AppState};
use crate::controllers::UtilityView;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_utilities).post(add_utility))
        .route("/:id", get(get_utility).put(edit_utility).delete(delete_utility))
        .route("/:id/installations", post(install))
        .route("/:id/installations/:unit_id", delete(uninstall))
        .route("/:id/main_unit", put(set_main_unit))
}

/// A new utility and the units it is installed on.
#[derive(Debug, Deserialize)]
pub struct CreateUtility {
    #[serde(flatten)]
    pub utility: NewUtility,
    pub installations: Vec<NewInstallation>,
    #[serde(default)]
    pub main_unit_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MainUnit {
    pub unit_id: i64,
}

async fn list_utilities(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Utility>>, ApiError> {
    let query = params.into_read_query(state.default_page_size);
    Ok(Json(state.utilities.list_utilities(&query).await?))
}

async fn add_utility(
    State(state): State<AppState>,
    Json(body): Json<CreateUtility>,
) -> Result<(StatusCode, Json<UtilityView>), ApiError> {
    let view = state
        .utilities
        .add_utility(body.utility, body.installations, body.main_unit_id)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_utility(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<UtilityView>, ApiError> {
    Ok(Json(state.utilities.get_utility(id).await?))
}

async fn edit_utility(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<NewUtility>,
) -> Result<Json<Utility>, ApiError> {
    Ok(Json(state.utilities.edit_utility(id, body).await?))
}

async fn delete_utility(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.utilities.delete_utility(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn install(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<NewInstallation>,
) -> Result<(StatusCode, Json<InstalledUtility>), ApiError> {
    let installation = state.utilities.install(id, body).await?;
    Ok((StatusCode::CREATED, Json(installation)))
}

async fn uninstall(
    State(state): State<AppState>,
    Path((id, unit_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state.utilities.uninstall(id, unit_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_main_unit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<MainUnit>,
) -> Result<Json<UtilityView>, ApiError> {
    state.utilities.set_main_unit(id, body.unit_id).await?;
    Ok(Json(state.utilities.get_utility(id).await?))
}
