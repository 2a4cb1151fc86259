mod common;

use std::io::Write;

use common::{installed_on, memory_pool, new_unit, new_utility};
use rental_client::{
    db::ReadQuery,
    domain::{BillStatus, Money, UtilityType},
};
use rental_service::{
    config::ImportConfig,
    controllers::{BillController, UnitController, UtilityController},
    import::import_file,
    pipeline::PipelineError,
};
use sqlx::SqlitePool;

async fn seeded() -> (SqlitePool, i64, i64) {
    let pool = memory_pool().await;
    let unit = UnitController::new(pool.clone()).add_unit(new_unit("A")).await.unwrap();
    let view = UtilityController::new(pool.clone())
        .add_utility(new_utility(UtilityType::Water, "City"), vec![installed_on(unit.id)], None)
        .await
        .unwrap();
    (pool, unit.id, view.utility.id)
}

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    write_bytes(dir, name, contents.as_bytes())
}

fn write_bytes(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents).unwrap();
    path
}

fn small_batches() -> ImportConfig {
    ImportConfig {
        batch_size: 2,
        max_retries: 0,
        retry_backoff_ms: 1,
    }
}

#[tokio::test]
async fn csv_import_stores_valid_rows_and_reports_the_rest() {
    let (pool, unit, utility) = seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let csv = format!(
        "unit_id,utility_id,total_amount,billing_period_start,billing_period_end,due_date,status\n\
         {unit},{utility},45.10,2024-01-01,2024-01-31,2024-02-15,paid\n\
         {unit},{utility},-3,2024-02-01,2024-02-29,2024-03-15,\n\
         {unit},{utility},abc,2024-03-01,2024-03-31,2024-04-15,\n\
         {unit},999,10,2024-03-01,2024-03-31,2024-04-15,\n\
         {unit},{utility},52.00,2024-04-01,2024-04-30,2024-05-15,\n"
    );
    let path = write_file(&dir, "bills.csv", &csv);

    let bills = BillController::new(pool.clone());
    let report = import_file(&path, bills.clone(), &small_batches()).await.unwrap();

    assert_eq!(report.read, 5);
    assert_eq!(report.imported, 2);
    let lines: Vec<u64> = report.rejected.iter().map(|r| r.line).collect();
    assert_eq!(lines, vec![3, 4, 5]);
    assert_eq!(report.rejected[0].reason, "Total Amount cannot be negative");

    let page = bills.list_bills(&ReadQuery::new()).await.unwrap();
    assert_eq!(page.total_items, 2);
    assert_eq!(page.items[0].total_amount, Money::from_cents(4_510));
    assert_eq!(page.items[0].status, BillStatus::Paid);
}

#[tokio::test]
async fn ndjson_import_accepts_numbers_and_strings() {
    let (pool, unit, utility) = seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let ndjson = format!(
        "{{\"unit_id\":{unit},\"utility_id\":{utility},\"total_amount\":12.5,\"billing_period_start\":\"2024-01-01\",\"billing_period_end\":\"2024-01-31\",\"due_date\":\"2024-02-10\"}}\n\
         \n\
         not json\n\
         {{\"unit_id\":{unit},\"utility_id\":{utility},\"total_amount\":\"80\",\"billing_period_start\":\"2024-02-01\",\"billing_period_end\":\"2024-02-29\",\"due_date\":\"2024-03-10\",\"status\":\"overdue\"}}\n"
    );
    let path = write_file(&dir, "bills.ndjson", &ndjson);

    let bills = BillController::new(pool.clone());
    let report = import_file(&path, bills.clone(), &small_batches()).await.unwrap();

    assert_eq!(report.read, 3);
    assert_eq!(report.imported, 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].line, 3);

    let page = bills.list_bills(&ReadQuery::new()).await.unwrap();
    let amounts: Vec<Money> = page.items.iter().map(|b| b.total_amount).collect();
    assert_eq!(amounts, vec![Money::from_cents(1_250), Money::from_cents(8_000)]);
}

#[tokio::test]
async fn ndjson_line_with_invalid_utf8_is_rejected_without_ending_the_import() {
    let (pool, unit, utility) = seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let good = |start: &str, end: &str, due: &str| {
        format!(
            "{{\"unit_id\":{unit},\"utility_id\":{utility},\"total_amount\":\"20\",\"billing_period_start\":\"{start}\",\"billing_period_end\":\"{end}\",\"due_date\":\"{due}\"}}\n"
        )
    };
    let mut contents = good("2024-01-01", "2024-01-31", "2024-02-10").into_bytes();
    contents.extend_from_slice(b"\xff\xfe bad\n");
    contents.extend_from_slice(good("2024-02-01", "2024-02-29", "2024-03-10").as_bytes());
    let path = write_bytes(&dir, "bills.jsonl", &contents);

    let cfg = ImportConfig {
        batch_size: 1,
        ..small_batches()
    };
    let bills = BillController::new(pool.clone());
    let report = import_file(&path, bills.clone(), &cfg).await.unwrap();

    assert_eq!(report.read, 3);
    assert_eq!(report.imported, 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].line, 2);
    assert!(report.rejected[0].reason.contains("UTF-8"));

    let page = bills.list_bills(&ReadQuery::new()).await.unwrap();
    assert_eq!(page.total_items, 2);
}

#[tokio::test]
async fn missing_file_is_a_source_error() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.csv");

    let err = import_file(&path, BillController::new(pool), &ImportConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Source(_)));
}
