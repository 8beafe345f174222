use std::{fmt, str::FromStr};

use awsses_common::{
    Region,
    error::{ExporterError, Result},
};

pub const DEFAULT_REGIONS: &str = "us-east-1,us-west-2";
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9199";
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";
pub const HEALTH_PATH: &str = "/-/healthy";
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// What a collection cycle does when a region's request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failing region and emit nothing for the cycle.
    #[default]
    AbortCycle,
    /// Fetch regions concurrently and emit every region that succeeded.
    BestEffort,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AbortCycle => "abort-cycle",
            Self::BestEffort => "best-effort",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = ExporterError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "abort-cycle" => Ok(Self::AbortCycle),
            "best-effort" => Ok(Self::BestEffort),
            other => Err(ExporterError::InvalidArgument(format!(
                "unknown failure policy {other}, expected abort-cycle or best-effort"
            ))),
        }
    }
}

/// Fixed for the process lifetime and shared read-only by every scrape.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub regions: Vec<Region>,
    pub failure_policy: FailurePolicy,
    pub emit_timestamp: bool,
    pub max_concurrency: usize,
}

impl CollectorConfig {
    pub fn new(regions: Vec<Region>) -> Self {
        Self {
            regions,
            failure_policy: FailurePolicy::default(),
            emit_timestamp: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::new(Region::parse_list(DEFAULT_REGIONS).unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    /// `host:port`, resolved when the listener binds.
    pub listen_address: String,
    pub telemetry_path: String,
}

impl WebConfig {
    pub fn new(listen_address: &str, telemetry_path: &str) -> Result<Self> {
        Ok(Self {
            listen_address: parse_listen_address(listen_address)?,
            telemetry_path: validate_telemetry_path(telemetry_path)?,
        })
    }
}

/// Accepts `host:port` or a bare `:port`, which binds every interface.
/// Host names are kept as given and resolved at bind time.
pub fn parse_listen_address(value: &str) -> Result<String> {
    let value = value.trim();
    let invalid = || ExporterError::InvalidArgument(format!("invalid listen address: {value}"));

    let (host, port) = value.rsplit_once(':').ok_or_else(invalid)?;
    port.parse::<u16>().map_err(|_| invalid())?;

    if host.is_empty() {
        return Ok(format!("0.0.0.0:{port}"));
    }
    if host.chars().any(char::is_whitespace) || (host.contains(':') && !host.starts_with('[')) {
        return Err(invalid());
    }
    Ok(value.to_string())
}

fn validate_telemetry_path(value: &str) -> Result<String> {
    let valid = value.starts_with('/')
        && value != "/"
        && value != HEALTH_PATH
        && !value.chars().any(|ch| ch.is_whitespace() || ch == '?' || ch == '#');

    if valid {
        Ok(value.to_string())
    } else {
        Err(ExporterError::InvalidArgument(format!(
            "invalid telemetry path: {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_failure_policies() {
        assert_eq!("abort-cycle".parse::<FailurePolicy>().unwrap(), FailurePolicy::AbortCycle);
        assert_eq!("best-effort".parse::<FailurePolicy>().unwrap(), FailurePolicy::BestEffort);
        assert!("retry".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default().to_string(), "abort-cycle");
    }

    #[test]
    fn default_collector_config_uses_two_regions() {
        let config = CollectorConfig::default();
        let regions: Vec<&str> = config.regions.iter().map(Region::as_str).collect();
        assert_eq!(regions, ["us-east-1", "us-west-2"]);
        assert!(!config.emit_timestamp);
    }

    #[test]
    fn bare_port_binds_all_interfaces() {
        let config = WebConfig::new(DEFAULT_LISTEN_ADDRESS, DEFAULT_TELEMETRY_PATH).unwrap();
        assert_eq!(config.listen_address, "0.0.0.0:9199");
        assert_eq!(parse_listen_address("127.0.0.1:8080").unwrap(), "127.0.0.1:8080");
        assert_eq!(parse_listen_address("[::]:9199").unwrap(), "[::]:9199");
        assert!(parse_listen_address("localhost").is_err());
        assert!(parse_listen_address(":http").is_err());
        assert!(parse_listen_address("::1:9199").is_err());
    }

    #[test]
    fn host_names_are_left_for_bind_to_resolve() {
        let config = WebConfig::new("localhost:9199", DEFAULT_TELEMETRY_PATH).unwrap();
        assert_eq!(config.listen_address, "localhost:9199");
        assert_eq!(
            parse_listen_address("exporter.internal:9300").unwrap(),
            "exporter.internal:9300"
        );
    }

    #[test]
    fn telemetry_path_must_not_shadow_other_routes() {
        assert!(WebConfig::new(":9199", "/").is_err());
        assert!(WebConfig::new(":9199", "metrics").is_err());
        assert!(WebConfig::new(":9199", HEALTH_PATH).is_err());
        assert!(WebConfig::new(":9199", "/ses/metrics").is_ok());
    }
}
