use std::{sync::Arc, time::Duration};

use awsses_auth::{CredentialProvider, StaticCredentialProvider};
use awsses_common::{Region, error::Result as ExporterResult};
use awsses_exporter::{
    CollectorConfig, ExporterState, FailurePolicy, WebConfig,
    config::{
        DEFAULT_LISTEN_ADDRESS, DEFAULT_MAX_CONCURRENCY, DEFAULT_REGIONS, DEFAULT_TELEMETRY_PATH,
    },
    exporter_router,
};
use awsses_ses::{HttpSesClientFactory, SesClientConfig};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "awsses_exporter",
    version,
    about = "Prometheus exporter for AWS SES send statistics"
)]
struct Cli {
    /// Address to listen on for web interface and telemetry.
    #[arg(long = "web.listen-address", default_value = DEFAULT_LISTEN_ADDRESS)]
    listen_address: String,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path", default_value = DEFAULT_TELEMETRY_PATH)]
    telemetry_path: String,

    /// Comma separated SES regions queried on every scrape.
    #[arg(long = "aws.regions", env = "AWSSES_REGIONS", default_value = DEFAULT_REGIONS)]
    regions: String,

    /// Endpoint used instead of https://email.<region>.amazonaws.com.
    #[arg(long = "aws.endpoint-url", env = "AWS_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    #[arg(long = "aws.request-timeout-secs", default_value_t = 10)]
    request_timeout_secs: u64,

    /// abort-cycle or best-effort.
    #[arg(long = "collector.failure-policy", default_value_t = FailurePolicy::AbortCycle)]
    failure_policy: FailurePolicy,

    /// Also publish the timestamp of the selected data point.
    #[arg(long = "collector.emit-timestamp", default_value_t = false)]
    emit_timestamp: bool,

    /// Regions fetched in parallel under the best-effort policy.
    #[arg(long = "collector.max-concurrency", default_value_t = DEFAULT_MAX_CONCURRENCY)]
    max_concurrency: usize,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long = "log.level", default_value = "info")]
    log_level: String,

    /// text (tracing-subscriber's human-readable format) or json.
    #[arg(long = "log.format", default_value = "text", value_parser = ["text", "json"])]
    log_format: String,
}

impl Cli {
    fn web_config(&self) -> ExporterResult<WebConfig> {
        WebConfig::new(&self.listen_address, &self.telemetry_path)
    }

    fn collector_config(&self) -> ExporterResult<CollectorConfig> {
        let mut config = CollectorConfig::new(Region::parse_list(&self.regions)?);
        config.failure_policy = self.failure_policy;
        config.emit_timestamp = self.emit_timestamp;
        config.max_concurrency = self.max_concurrency.max(1);
        Ok(config)
    }

    fn ses_client_config(&self) -> SesClientConfig {
        SesClientConfig {
            endpoint_url: self.endpoint_url.clone().filter(|url| !url.trim().is_empty()),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn init_tracing(level: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format)?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting awsses_exporter");
    info!(
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "build context"
    );

    let web = cli.web_config()?;
    let collector = cli.collector_config()?;
    info!(
        regions = %cli.regions,
        failure_policy = %collector.failure_policy,
        emit_timestamp = collector.emit_timestamp,
        "collector configured"
    );

    let credentials = StaticCredentialProvider::from_env();
    if !credentials.is_configured() {
        warn!("AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY not set, every scrape will fail");
    }
    let credentials: Arc<dyn CredentialProvider> = Arc::new(credentials);
    let clients = Arc::new(HttpSesClientFactory::new(cli.ses_client_config(), credentials)?);

    let state = Arc::new(ExporterState::new(&web, collector, clients)?);
    let app = exporter_router(state);

    let listener = match tokio::net::TcpListener::bind(web.listen_address.as_str()).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(
                address = %web.listen_address,
                error = %err,
                "failed to start HTTP listener"
            );
            return Err(err.into());
        }
    };
    info!(
        address = %web.listen_address,
        telemetry_path = %web.telemetry_path,
        "starting HTTP server"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, FailurePolicy};

    #[test]
    fn defaults_match_exporter_conventions() {
        let cli = Cli::try_parse_from(["awsses_exporter"]).unwrap();
        let web = cli.web_config().unwrap();
        assert_eq!(web.listen_address, "0.0.0.0:9199");
        assert_eq!(web.telemetry_path, "/metrics");

        let collector = cli.collector_config().unwrap();
        assert_eq!(collector.regions.len(), 2);
        assert_eq!(collector.failure_policy, FailurePolicy::AbortCycle);
        assert!(!collector.emit_timestamp);
        assert_eq!(cli.log_format, "text");
    }

    #[test]
    fn parses_dotted_flags() {
        let cli = Cli::try_parse_from([
            "awsses_exporter",
            "--web.listen-address",
            "127.0.0.1:9300",
            "--web.telemetry-path=/ses-metrics",
            "--aws.regions",
            "eu-west-1",
            "--aws.endpoint-url",
            "http://localhost:4566",
            "--collector.failure-policy",
            "best-effort",
            "--collector.emit-timestamp",
            "--collector.max-concurrency",
            "0",
            "--log.format",
            "json",
        ])
        .unwrap();

        let web = cli.web_config().unwrap();
        assert_eq!(web.listen_address, "127.0.0.1:9300");
        assert_eq!(web.telemetry_path, "/ses-metrics");

        let collector = cli.collector_config().unwrap();
        assert_eq!(collector.regions[0].as_str(), "eu-west-1");
        assert_eq!(collector.failure_policy, FailurePolicy::BestEffort);
        assert!(collector.emit_timestamp);
        assert_eq!(collector.max_concurrency, 1);

        let ses = cli.ses_client_config();
        assert_eq!(ses.endpoint_url.as_deref(), Some("http://localhost:4566"));
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(
            Cli::try_parse_from(["awsses_exporter", "--collector.failure-policy", "retry"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["awsses_exporter", "--log.format", "xml"]).is_err());
    }
}
