pub mod aggregate;
pub mod checkpoint;
pub mod config;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;

pub use aggregate::Granularity;
pub use pipeline::{Pipeline, PipelineError, RecordSource, Sink};
