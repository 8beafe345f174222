use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use awsses_common::{Region, error::Result};
use awsses_ses::{SendDataPoint, SesClientFactory};
use futures::{StreamExt, stream};
use tracing::{debug, warn};

use crate::{
    config::{CollectorConfig, FailurePolicy},
    metrics::{
        descriptors::SesDescriptors,
        registry::Collector,
        types::{MetricDescriptor, MetricSample, MetricSink, MetricValue},
    },
};

/// The data point with the greatest timestamp; the earliest listed wins ties.
pub fn select_latest(points: &[SendDataPoint]) -> Option<&SendDataPoint> {
    points.iter().reduce(|latest, point| {
        if point.timestamp > latest.timestamp {
            point
        } else {
            latest
        }
    })
}

/// Latest data point of each region that reported one, in region order.
/// Rebuilt on every collection cycle.
#[derive(Debug, Default)]
pub struct LatestByRegion {
    entries: Vec<(Region, SendDataPoint)>,
}

impl LatestByRegion {
    pub fn insert(&mut self, region: Region, point: SendDataPoint) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == region) {
            Some((_, slot)) => *slot = point,
            None => self.entries.push((region, point)),
        }
    }

    pub fn get(&self, region: &Region) -> Option<&SendDataPoint> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == region)
            .map(|(_, point)| point)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Region, &SendDataPoint)> {
        self.entries.iter().map(|(region, point)| (region, point))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct SesCollector {
    descriptors: SesDescriptors,
    config: Arc<CollectorConfig>,
    clients: Arc<dyn SesClientFactory>,
}

impl SesCollector {
    pub fn new(config: CollectorConfig, clients: Arc<dyn SesClientFactory>) -> Self {
        Self {
            descriptors: SesDescriptors::new(),
            config: Arc::new(config),
            clients,
        }
    }

    async fn fetch_latest(&self, region: &Region) -> Result<Option<SendDataPoint>> {
        let client = self.clients.client_for(region);
        let points = client.get_send_statistics().await?;
        debug!(region = %region, points = points.len(), "fetched send statistics");
        Ok(select_latest(&points).cloned())
    }

    /// Sequential pass that gives up on the whole cycle at the first failure.
    async fn collect_abort_cycle(&self) -> Option<LatestByRegion> {
        let mut latest = LatestByRegion::default();
        for region in &self.config.regions {
            match self.fetch_latest(region).await {
                Ok(Some(point)) => latest.insert(region.clone(), point),
                Ok(None) => debug!(region = %region, "no send data points, skipping region"),
                Err(err) => {
                    log_fetch_error(region, &err);
                    warn!(
                        region = %region,
                        collected_regions = latest.len(),
                        "abandoning collection cycle"
                    );
                    return None;
                }
            }
        }
        Some(latest)
    }

    async fn collect_best_effort(&self) -> LatestByRegion {
        let results = stream::iter(self.config.regions.iter().cloned())
            .map(|region| async move {
                let result = self.fetch_latest(&region).await;
                (region, result)
            })
            .buffered(self.config.max_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut latest = LatestByRegion::default();
        for (region, result) in results {
            match result {
                Err(err) => log_fetch_error(&region, &err),
                Ok(Some(point)) => latest.insert(region, point),
                Ok(None) => debug!(region = %region, "no send data points, skipping region"),
            }
        }
        latest
    }

    fn emit(&self, latest: &LatestByRegion, sink: &mut MetricSink) {
        for (region, point) in latest.iter() {
            let region = region.as_str();
            emit_gauge(sink, &self.descriptors.bounces, point.bounces as f64, region);
            emit_gauge(sink, &self.descriptors.complaints, point.complaints as f64, region);
            emit_gauge(
                sink,
                &self.descriptors.delivery_attempts,
                point.delivery_attempts as f64,
                region,
            );
            emit_gauge(sink, &self.descriptors.rejects, point.rejects as f64, region);
            if self.config.emit_timestamp {
                emit_gauge(
                    sink,
                    &self.descriptors.timestamp,
                    point.timestamp.timestamp() as f64,
                    region,
                );
            }
        }
    }
}

#[async_trait]
impl Collector for SesCollector {
    fn describe(&self) -> Vec<MetricDescriptor> {
        self.descriptors.describe()
    }

    async fn collect(&self, sink: &mut MetricSink) {
        let started_at = Instant::now();
        let latest = match self.config.failure_policy {
            FailurePolicy::AbortCycle => match self.collect_abort_cycle().await {
                Some(latest) => latest,
                None => return,
            },
            FailurePolicy::BestEffort => self.collect_best_effort().await,
        };

        self.emit(&latest, sink);
        debug!(
            regions = latest.len(),
            samples = sink.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "collection cycle finished"
        );
    }
}

fn emit_gauge(sink: &mut MetricSink, descriptor: &MetricDescriptor, value: f64, region: &str) {
    match MetricSample::new_const(descriptor, MetricValue::Gauge(value), &[region]) {
        Ok(sample) => sink.emit(sample),
        Err(err) => warn!(metric = %descriptor.name, error = %err, "failed to build sample"),
    }
}

fn log_fetch_error(region: &Region, err: &awsses_common::ExporterError) {
    match err.error_code() {
        Some(code) => warn!(region = %region, code, error = %err, "GetSendStatistics failed"),
        None => warn!(region = %region, error = %err, "GetSendStatistics failed"),
    }
}
