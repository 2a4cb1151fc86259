use std::path::PathBuf;

use async_stream::stream;
use rental_client::domain::NewBill;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

use crate::pipeline::{Envelope, PipelineError, RecordStream, Source};

/// NDJSON import source: one bill object per line, in the same shape the
/// HTTP API accepts. Blank lines are skipped.
pub struct BillNdjsonFileSource {
    path: PathBuf,
}

impl BillNdjsonFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Source<NewBill> for BillNdjsonFileSource {
    async fn stream(&self) -> RecordStream<NewBill> {
        let path = self.path.clone();
        let s = stream! {
            let file = match File::open(&path).await {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to open NDJSON file {}: {e}", path.display())));
                    return;
                }
            };
            let mut reader = BufReader::new(file);
            let mut buf = Vec::new();
            let mut line: u64 = 0;

            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(PipelineError::Source(format!("failed to read line {}: {e}", line + 1)));
                        return;
                    }
                }
                line += 1;

                let text = match std::str::from_utf8(&buf) {
                    Ok(text) => text,
                    Err(e) => {
                        metrics::counter!("bill_import_parse_errors_total").increment(1);
                        yield Err(PipelineError::Record { line, reason: format!("line is not valid UTF-8: {e}") });
                        continue;
                    }
                };
                if text.trim().is_empty() {
                    continue;
                }

                match serde_json::from_str::<NewBill>(text) {
                    Ok(bill) => yield Ok(Envelope { payload: bill, line }),
                    Err(e) => {
                        metrics::counter!("bill_import_parse_errors_total").increment(1);
                        yield Err(PipelineError::Record { line, reason: format!("invalid bill JSON: {e}") });
                    }
                }
            }
        };

        Box::pin(s)
    }
}
