use anyhow::Result;
use rental_client::db;
use rental_service::{
    api::{self, AppState},
    config::AppConfig,
    controllers::BillController,
    metrics_server, observability,
};
use time::OffsetDateTime;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr).await?;
    }

    let pool = db::connect(&cfg.database.url, cfg.database.max_connections).await?;
    db::apply_schema(&pool).await?;
    tracing::info!(url = %cfg.database.url, "database ready");

    // Catch up on bills that went overdue while the service was down.
    let today = OffsetDateTime::now_utc().date();
    BillController::new(pool.clone()).mark_overdue(today).await?;

    let state = AppState::new(pool.clone(), &cfg);
    api::serve(&cfg.http.bind_addr, state).await?;

    pool.close().await;
    Ok(())
}
