use std::{
    collections::HashSet,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use awsses_common::error::{ExporterError, Result};
use tracing::warn;

use crate::metrics::types::{
    MetricDescriptor, MetricFamily, MetricSample, MetricSink, MetricValue,
};

/// A source of metrics that is asked for fresh samples on every scrape.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Every descriptor this collector may emit samples for.
    fn describe(&self) -> Vec<MetricDescriptor>;

    async fn collect(&self, sink: &mut MetricSink);
}

#[derive(Default)]
struct RegistryInner {
    collectors: Vec<Arc<dyn Collector>>,
    names: HashSet<String>,
}

pub struct MetricsRegistry {
    inner: RwLock<RegistryInner>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let descriptors = collector.describe();
        let mut inner = self.inner.write().map_err(|_| {
            ExporterError::InternalError("failed to acquire metrics registry lock".to_string())
        })?;

        let mut pending = HashSet::new();
        for descriptor in &descriptors {
            validate_descriptor(descriptor)?;
            if inner.names.contains(&descriptor.name) || !pending.insert(descriptor.name.clone()) {
                return Err(ExporterError::InvalidArgument(format!(
                    "metric already registered: {}",
                    descriptor.name
                )));
            }
        }

        inner.names.extend(pending);
        inner.collectors.push(collector);
        Ok(())
    }

    pub fn describe(&self) -> Vec<MetricDescriptor> {
        self.collectors()
            .iter()
            .flat_map(|collector| collector.describe())
            .collect()
    }

    /// Runs every registered collector once and groups the samples into
    /// families, in describe order. Families without samples are omitted.
    pub async fn gather(&self) -> Vec<MetricFamily> {
        let mut families = Vec::new();
        for collector in self.collectors() {
            let mut sink = MetricSink::new();
            collector.collect(&mut sink).await;
            families.extend(group_samples(collector.describe(), sink.into_samples()));
        }
        families
    }

    pub async fn render_prometheus(&self) -> String {
        render_prometheus(&self.gather().await)
    }

    /// Registration never leaves the collector list half-updated, so a
    /// poisoned lock still holds a usable list.
    fn collectors(&self) -> Vec<Arc<dyn Collector>> {
        match self.inner.read() {
            Ok(guard) => guard.collectors.clone(),
            Err(poisoned) => {
                warn!("metrics registry lock poisoned, serving registered collectors anyway");
                poisoned.into_inner().collectors.clone()
            }
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn group_samples(
    descriptors: Vec<MetricDescriptor>,
    samples: Vec<MetricSample>,
) -> Vec<MetricFamily> {
    let mut families = descriptors
        .into_iter()
        .map(|descriptor| MetricFamily {
            descriptor,
            samples: Vec::new(),
        })
        .collect::<Vec<_>>();

    for sample in samples {
        match families
            .iter_mut()
            .find(|family| family.descriptor.name == sample.name)
        {
            Some(family) => family.samples.push(sample),
            None => warn!(metric = %sample.name, "dropping sample without a described metric"),
        }
    }

    families.retain(|family| !family.samples.is_empty());
    families
}

pub fn render_prometheus(families: &[MetricFamily]) -> String {
    let mut output = String::new();

    for family in families {
        output.push_str("# HELP ");
        output.push_str(&family.descriptor.name);
        output.push(' ');
        output.push_str(&escape_help(&family.descriptor.help));
        output.push('\n');

        output.push_str("# TYPE ");
        output.push_str(&family.descriptor.name);
        output.push(' ');
        output.push_str(family.descriptor.metric_type.as_prometheus_type());
        output.push('\n');

        for sample in &family.samples {
            match sample.value {
                MetricValue::Gauge(value) => {
                    output.push_str(&render_sample_line(&sample.name, &sample.labels, value));
                }
            }
        }
    }

    output
}

fn validate_descriptor(descriptor: &MetricDescriptor) -> Result<()> {
    if !is_valid_name(&descriptor.name, true) {
        return Err(ExporterError::InvalidArgument(format!(
            "invalid metric name: {}",
            descriptor.name
        )));
    }

    let mut labels = HashSet::new();
    for label in &descriptor.variable_labels {
        if !is_valid_name(label, false) || label.starts_with("__") || !labels.insert(label) {
            return Err(ExporterError::InvalidArgument(format!(
                "invalid label {label} for metric {}",
                descriptor.name
            )));
        }
    }
    Ok(())
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*` for metric names, without `:` for labels.
fn is_valid_name(name: &str, allow_colon: bool) -> bool {
    let valid_char = |ch: char, first: bool| {
        ch.is_ascii_alphabetic()
            || ch == '_'
            || (allow_colon && ch == ':')
            || (!first && ch.is_ascii_digit())
    };

    let mut chars = name.chars();
    match chars.next() {
        Some(first) if valid_char(first, true) => chars.all(|ch| valid_char(ch, false)),
        _ => false,
    }
}

fn render_sample_line(name: &str, labels: &[(String, String)], value: f64) -> String {
    let mut rendered = String::new();
    rendered.push_str(name);

    if !labels.is_empty() {
        rendered.push('{');
        for (index, (key, value)) in labels.iter().enumerate() {
            if index > 0 {
                rendered.push(',');
            }
            rendered.push_str(key);
            rendered.push_str("=\"");
            rendered.push_str(&escape_label_value(value));
            rendered.push('"');
        }
        rendered.push('}');
    }

    rendered.push(' ');
    rendered.push_str(&format_metric_value(value));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.is_infinite() {
        if value.is_sign_positive() { "+Inf" } else { "-Inf" }.to_string()
    } else if value.is_nan() {
        "NaN".to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::metrics::types::{MetricDescriptor, MetricSample, MetricSink, MetricValue};

    struct FixedCollector {
        descriptors: Vec<MetricDescriptor>,
        samples: Vec<MetricSample>,
    }

    #[async_trait]
    impl Collector for FixedCollector {
        fn describe(&self) -> Vec<MetricDescriptor> {
            self.descriptors.clone()
        }

        async fn collect(&self, sink: &mut MetricSink) {
            for sample in &self.samples {
                sink.emit(sample.clone());
            }
        }
    }

    fn gauge(name: &str) -> MetricDescriptor {
        MetricDescriptor::gauge(name, format!("{name} help"), &["zone"])
    }

    fn sample(descriptor: &MetricDescriptor, value: f64, zone: &str) -> MetricSample {
        MetricSample::new_const(descriptor, MetricValue::Gauge(value), &[zone]).unwrap()
    }

    #[test]
    fn rejects_duplicate_and_invalid_names() {
        let registry = MetricsRegistry::new();
        let first = Arc::new(FixedCollector {
            descriptors: vec![gauge("mail_sent")],
            samples: Vec::new(),
        });
        registry.register(first).unwrap();

        let duplicate = Arc::new(FixedCollector {
            descriptors: vec![gauge("mail_sent")],
            samples: Vec::new(),
        });
        assert!(registry.register(duplicate).is_err());

        let invalid = Arc::new(FixedCollector {
            descriptors: vec![gauge("mail-sent")],
            samples: Vec::new(),
        });
        assert!(registry.register(invalid).is_err());

        let reserved_label = Arc::new(FixedCollector {
            descriptors: vec![MetricDescriptor::gauge("mail_failed", "help", &["__zone"])],
            samples: Vec::new(),
        });
        assert!(registry.register(reserved_label).is_err());

        assert_eq!(registry.describe().len(), 1);
    }

    #[tokio::test]
    async fn gather_survives_a_poisoned_lock() {
        let descriptor = gauge("mail_sent");
        let registry = Arc::new(MetricsRegistry::new());
        registry
            .register(Arc::new(FixedCollector {
                descriptors: vec![descriptor.clone()],
                samples: vec![sample(&descriptor, 3.0, "a")],
            }))
            .unwrap();

        let poisoner = Arc::clone(&registry);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("poison the registry lock");
        })
        .join();
        assert!(result.is_err());
        assert!(registry.inner.is_poisoned());

        assert_eq!(registry.describe().len(), 1);
        let families = registry.gather().await;
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].samples[0].value.get(), 3.0);
    }

    #[test]
    fn validates_name_grammar() {
        assert!(is_valid_name("awsses_exporter_deliveryAttempts", true));
        assert!(is_valid_name("job:rate5m", true));
        assert!(!is_valid_name("job:rate5m", false));
        assert!(!is_valid_name("5xx", true));
        assert!(!is_valid_name("", true));
    }

    #[tokio::test]
    async fn gather_groups_in_describe_order_and_skips_empty_families() {
        let sent = gauge("mail_sent");
        let failed = gauge("mail_failed");
        let unused = gauge("mail_unused");
        let undeclared = gauge("mail_undeclared");

        let registry = MetricsRegistry::new();
        registry
            .register(Arc::new(FixedCollector {
                descriptors: vec![sent.clone(), failed.clone(), unused],
                samples: vec![
                    sample(&failed, 1.0, "a"),
                    sample(&sent, 10.0, "a"),
                    sample(&undeclared, 5.0, "a"),
                    sample(&sent, 20.0, "b"),
                ],
            }))
            .unwrap();

        let families = registry.gather().await;
        let names: Vec<&str> = families
            .iter()
            .map(|family| family.descriptor.name.as_str())
            .collect();
        assert_eq!(names, ["mail_sent", "mail_failed"]);
        assert_eq!(families[0].samples.len(), 2);
    }

    #[test]
    fn renders_text_exposition() {
        let descriptor = MetricDescriptor::gauge("mail_sent", "Mail \\ sent\nper zone", &["zone"]);
        let families = vec![MetricFamily {
            samples: vec![
                sample(&descriptor, 42.0, "a\"b"),
                sample(&descriptor, 0.5, "c"),
            ],
            descriptor,
        }];

        assert_eq!(
            render_prometheus(&families),
            "# HELP mail_sent Mail \\\\ sent\\nper zone\n\
             # TYPE mail_sent gauge\n\
             mail_sent{zone=\"a\\\"b\"} 42\n\
             mail_sent{zone=\"c\"} 0.5\n"
        );
    }

    #[test]
    fn formats_special_values() {
        assert_eq!(format_metric_value(f64::INFINITY), "+Inf");
        assert_eq!(format_metric_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_metric_value(f64::NAN), "NaN");
        assert_eq!(format_metric_value(1_234_567.0), "1234567");
    }
}
