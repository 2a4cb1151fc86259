//! JSON HTTP API over the controllers.

use std::net::SocketAddr;

use anyhow::Context;
use axum::{routing::get, Router};
use sqlx::SqlitePool;

use crate::{
    config::AppConfig,
    controllers::{BillController, UnitController, UtilityController},
    dashboard::DashboardService,
};

mod bills;
mod dashboard;
pub mod error;
pub mod params;
mod units;
mod utilities;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub units: UnitController,
    pub utilities: UtilityController,
    pub bills: BillController,
    pub dashboard: DashboardService,
    pub default_page_size: u32,
}

impl AppState {
    pub fn new(pool: SqlitePool, cfg: &AppConfig) -> Self {
        Self {
            units: UnitController::new(pool.clone()),
            utilities: UtilityController::new(pool.clone()),
            bills: BillController::new(pool.clone()),
            dashboard: DashboardService::new(pool, cfg.dashboard.upcoming_horizon_days),
            default_page_size: cfg.dashboard.default_page_size,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/units", units::router())
        .nest("/utilities", utilities::router())
        .nest("/bills", bills::router())
        .nest("/dashboard", dashboard::router())
        .with_state(state)
}

pub async fn serve(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid http.bind_addr '{bind_addr}'"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "rental api listening");
    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("api server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown requested");
}
