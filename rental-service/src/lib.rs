pub mod api;
pub mod config;
pub mod controllers;
pub mod dashboard;
pub mod import;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Envelope, ImportReport, Pipeline};
