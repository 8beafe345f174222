use crate::metrics::types::MetricDescriptor;

pub const NAMESPACE: &str = "awsses_exporter";
pub const REGION_LABEL: &str = "aws_region";

/// Joins the non-empty parts with `_`.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// The five per-region gauges published from SES send statistics.
#[derive(Debug, Clone)]
pub struct SesDescriptors {
    pub bounces: MetricDescriptor,
    pub complaints: MetricDescriptor,
    pub delivery_attempts: MetricDescriptor,
    pub rejects: MetricDescriptor,
    pub timestamp: MetricDescriptor,
}

impl SesDescriptors {
    pub fn new() -> Self {
        let gauge = |name: &str, help: &str| {
            MetricDescriptor::gauge(build_fq_name(NAMESPACE, "", name), help, &[REGION_LABEL])
        };

        Self {
            bounces: gauge("bounces", "Bounces per region"),
            complaints: gauge("complaints", "Complaints per region"),
            delivery_attempts: gauge("deliveryAttempts", "Delivery attempts per region"),
            rejects: gauge("rejects", "Rejects per region"),
            timestamp: gauge("timestamp", "Timestamp per region"),
        }
    }

    pub fn describe(&self) -> Vec<MetricDescriptor> {
        vec![
            self.bounces.clone(),
            self.complaints.clone(),
            self.delivery_attempts.clone(),
            self.rejects.clone(),
            self.timestamp.clone(),
        ]
    }
}

impl Default for SesDescriptors {
    fn default() -> Self {
        Self::new()
    }
}
