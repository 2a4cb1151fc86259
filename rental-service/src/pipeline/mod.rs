use std::{pin::Pin, sync::Arc};

use futures::{Stream, StreamExt};
use serde::Serialize;

/// A record together with the input line it was read from.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub line: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The input as a whole cannot be read. Ends the run.
    #[error("source error: {0}")]
    Source(String),
    /// One record is unusable. The record is skipped and reported.
    #[error("line {line}: {reason}")]
    Record { line: u64, reason: String },
    #[error("sink error: {0}")]
    Sink(String),
}

/// A record that did not make it into the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub read: u64,
    pub imported: u64,
    pub rejected: Vec<RejectedRow>,
}

impl ImportReport {
    pub fn reject(&mut self, line: u64, reason: impl Into<String>) {
        self.rejected.push(RejectedRow {
            line,
            reason: reason.into(),
        });
    }
}

pub type RecordStream<T> = Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> RecordStream<T>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<ImportReport, PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

pub struct Pipeline<S, T, K> {
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T, T> + Send + Sync>>,
    pub sink: K,
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    pub async fn run(self) -> Result<ImportReport, PipelineError> {
        let mut stream = self.source.stream().await;

        for t in self.transforms {
            stream = Box::pin(stream.then(move |item| {
                let t = t.clone();
                async move {
                    match item {
                        Ok(env) => t.apply(env).await,
                        Err(e) => Err(e),
                    }
                }
            }));
        }

        self.sink.run(stream).await
    }
}
