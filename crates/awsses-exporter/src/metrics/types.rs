use awsses_common::error::{ExporterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
}

impl MetricType {
    pub fn as_prometheus_type(&self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
        }
    }
}

/// Identity of a metric family, independent of any collected value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub metric_type: MetricType,
    pub variable_labels: Vec<String>,
}

impl MetricDescriptor {
    pub fn gauge(
        name: impl Into<String>,
        help: impl Into<String>,
        variable_labels: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            metric_type: MetricType::Gauge,
            variable_labels: variable_labels.iter().map(|label| (*label).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Gauge(f64),
}

impl MetricValue {
    pub fn metric_type(&self) -> MetricType {
        match self {
            Self::Gauge(_) => MetricType::Gauge,
        }
    }

    pub fn get(&self) -> f64 {
        match self {
            Self::Gauge(value) => *value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: MetricValue,
}

impl MetricSample {
    /// Builds a sample for `descriptor`, pairing `label_values` with its
    /// variable labels in order.
    pub fn new_const(
        descriptor: &MetricDescriptor,
        value: MetricValue,
        label_values: &[&str],
    ) -> Result<Self> {
        if value.metric_type() != descriptor.metric_type {
            return Err(ExporterError::InvalidArgument(format!(
                "{} is a {}, got a {} value",
                descriptor.name,
                descriptor.metric_type.as_prometheus_type(),
                value.metric_type().as_prometheus_type()
            )));
        }
        if label_values.len() != descriptor.variable_labels.len() {
            return Err(ExporterError::InvalidArgument(format!(
                "{} expects {} label values, got {}",
                descriptor.name,
                descriptor.variable_labels.len(),
                label_values.len()
            )));
        }

        Ok(Self {
            name: descriptor.name.clone(),
            labels: descriptor
                .variable_labels
                .iter()
                .zip(label_values)
                .map(|(name, value)| (name.clone(), (*value).to_string()))
                .collect(),
            value,
        })
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub descriptor: MetricDescriptor,
    pub samples: Vec<MetricSample>,
}

/// Samples produced by one collector during one scrape, in emission order.
#[derive(Debug, Default)]
pub struct MetricSink {
    samples: Vec<MetricSample>,
}

impl MetricSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, sample: MetricSample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<MetricSample> {
        self.samples
    }
}
