use anyhow::{bail, Result};
use rental_client::db;
use rental_service::{config::AppConfig, controllers::BillController, import, observability};
use std::{env, path::Path};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: import_bills <bills.csv|bills.ndjson>");
    }
    let file_path = Path::new(&args[1]);

    // Point RENTAL_CONFIG at an import-specific file to change batch sizes.
    let cfg = AppConfig::load()?;

    let pool = db::connect(&cfg.database.url, cfg.database.max_connections).await?;
    db::apply_schema(&pool).await?;

    let report = import::import_file(file_path, BillController::new(pool.clone()), &cfg.import).await?;
    for row in &report.rejected {
        eprintln!("line {}: {}", row.line, row.reason);
    }
    println!(
        "read {} row(s), imported {}, rejected {}",
        report.read,
        report.imported,
        report.rejected.len()
    );

    pool.close().await;
    Ok(())
}
