use std::sync::Arc;

use awsses_common::error::Result;
use awsses_ses::SesClientFactory;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    config::{CollectorConfig, HEALTH_PATH, WebConfig},
    handlers,
    metrics::{MetricsRegistry, SesCollector},
};

pub struct ExporterState {
    pub registry: Arc<MetricsRegistry>,
    pub telemetry_path: String,
}

impl ExporterState {
    pub fn new(
        web: &WebConfig,
        collector: CollectorConfig,
        clients: Arc<dyn SesClientFactory>,
    ) -> Result<Self> {
        let registry = Arc::new(MetricsRegistry::new());
        registry.register(Arc::new(SesCollector::new(collector, clients)))?;

        Ok(Self {
            registry,
            telemetry_path: web.telemetry_path.clone(),
        })
    }
}

pub fn exporter_router(state: Arc<ExporterState>) -> Router {
    Router::new()
        .route("/", get(handlers::index::index_page))
        .route(HEALTH_PATH, get(handlers::health::health_live))
        .route(
            &state.telemetry_path,
            get(handlers::metrics::prometheus_metrics),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
