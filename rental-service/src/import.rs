//! Bulk bill import from CSV or NDJSON files.

use std::{path::Path, sync::Arc, time::Duration};

use rental_client::domain::NewBill;

use crate::{
    config::ImportConfig,
    controllers::BillController,
    pipeline::{ImportReport, Pipeline, PipelineError, Source},
    sinks::BillStoreSink,
    sources::{BillCsvFileSource, BillNdjsonFileSource},
    transform::BillValidation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    Ndjson,
}

impl ImportFormat {
    /// Picks the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(ImportFormat::Csv),
            Some("ndjson" | "jsonl" | "json") => Ok(ImportFormat::Ndjson),
            _ => Err(PipelineError::Source(format!(
                "cannot tell the format of {}; expected a .csv, .ndjson or .jsonl file",
                path.display()
            ))),
        }
    }
}

pub async fn import_file(path: &Path, bills: BillController, cfg: &ImportConfig) -> Result<ImportReport, PipelineError> {
    let format = ImportFormat::from_path(path)?;
    tracing::info!(path = %path.display(), ?format, "importing bills");

    let sink = BillStoreSink::new(
        bills,
        cfg.batch_size,
        cfg.max_retries,
        Duration::from_millis(cfg.retry_backoff_ms),
    );

    match format {
        ImportFormat::Csv => run(BillCsvFileSource::new(path), sink).await,
        ImportFormat::Ndjson => run(BillNdjsonFileSource::new(path), sink).await,
    }
}

async fn run<S>(source: S, sink: BillStoreSink) -> Result<ImportReport, PipelineError>
where
    S: Source<NewBill> + 'static,
{
    let pipeline: Pipeline<_, NewBill, _> = Pipeline {
        source,
        transforms: vec![Arc::new(BillValidation)],
        sink,
    };
    pipeline.run().await
}
