pub mod collectors;
pub mod descriptors;
pub mod registry;
pub mod types;

pub use collectors::ses::{LatestByRegion, SesCollector, select_latest};
pub use descriptors::SesDescriptors;
pub use registry::{Collector, MetricsRegistry, render_prometheus};
pub use types::{MetricDescriptor, MetricFamily, MetricSample, MetricSink, MetricType, MetricValue};
