pub mod config;
pub mod handlers;
pub mod metrics;
pub mod router;

pub use config::{CollectorConfig, FailurePolicy, WebConfig};
pub use router::{ExporterState, exporter_router};
