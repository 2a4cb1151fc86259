use std::time::Duration;

use futures::StreamExt;
use rental_client::domain::NewBill;

use crate::{
    controllers::{BatchOutcome, BillController, ControllerError},
    pipeline::{Envelope, ImportReport, PipelineError, Sink},
};

/// Stores imported bills through [`BillController::add_bills`], one
/// transaction per batch.
pub struct BillStoreSink {
    bills: BillController,
    batch_size: usize,
    max_retries: u32,
    retry_backoff: Duration,
}

impl BillStoreSink {
    pub fn new(bills: BillController, batch_size: usize, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            bills,
            batch_size: batch_size.max(1),
            max_retries,
            retry_backoff,
        }
    }

    async fn flush_batch(&self, batch: &[Envelope<NewBill>], report: &mut ImportReport) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }
        let payloads: Vec<NewBill> = batch.iter().map(|env| env.payload.clone()).collect();

        let mut attempt: u32 = 0;
        let outcome = loop {
            match self.bills.add_bills(&payloads).await {
                Ok(outcome) => break outcome,
                Err(ControllerError::Db(e)) if attempt < self.max_retries => {
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(error = %e, attempt, "bill batch insert failed, retrying with backoff");
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "bill batch insert failed, giving up");
                    metrics::counter!("bill_import_sink_errors_total").increment(1);
                    return Err(PipelineError::Sink(e.to_string()));
                }
            }
        };

        record_outcome(batch, outcome, report);
        Ok(())
    }
}

fn record_outcome(batch: &[Envelope<NewBill>], outcome: BatchOutcome, report: &mut ImportReport) {
    let imported = outcome.inserted.len() as u64;
    report.imported += imported;
    metrics::counter!("bill_import_rows_imported_total").increment(imported);

    for (index, err) in outcome.rejected {
        let line = batch.get(index).map(|env| env.line).unwrap_or_default();
        tracing::warn!(line, error = %err, "bill rejected");
        metrics::counter!("bill_import_rows_rejected_total").increment(1);
        report.reject(line, err.to_string());
    }
}

#[async_trait::async_trait]
impl Sink<NewBill> for BillStoreSink {
    async fn run<S>(&self, mut input: S) -> Result<ImportReport, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<NewBill>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut report = ImportReport::default();
        let mut buffer: Vec<Envelope<NewBill>> = Vec::with_capacity(self.batch_size);

        while let Some(item) = input.next().await {
            match item {
                Ok(env) => {
                    report.read += 1;
                    buffer.push(env);
                }
                Err(PipelineError::Record { line, reason }) => {
                    report.read += 1;
                    tracing::warn!(line, error = %reason, "bill rejected");
                    metrics::counter!("bill_import_rows_rejected_total").increment(1);
                    report.reject(line, reason);
                }
                Err(e) => {
                    tracing::error!(error = %e, "bill import aborted");
                    return Err(e);
                }
            }

            if buffer.len() >= self.batch_size {
                self.flush_batch(&buffer, &mut report).await?;
                buffer.clear();
            }
        }

        self.flush_batch(&buffer, &mut report).await?;
        report.rejected.sort_by_key(|row| row.line);

        tracing::info!(
            read = report.read,
            imported = report.imported,
            rejected = report.rejected.len(),
            "bill import finished"
        );
        Ok(report)
    }
}
