use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use awsses_auth::{CredentialProvider, Credentials, SigningScope, sign_request};
use awsses_common::{
    Region,
    error::{ExporterError, Result},
    time,
};
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderValue, header};
use reqwest::Url;
use tracing::debug;

use crate::{
    types::SendDataPoint,
    xml::{parse_error_response, parse_send_statistics},
};

pub const SIGNING_SERVICE: &str = "ses";
const GET_SEND_STATISTICS_BODY: &str = "Action=GetSendStatistics&Version=2010-12-01";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

#[async_trait]
pub trait SendStatisticsApi: Send + Sync {
    /// Issues `GetSendStatistics` with no parameters.
    async fn get_send_statistics(&self) -> Result<Vec<SendDataPoint>>;
}

/// Builds a statistics client scoped to one region.
pub trait SesClientFactory: Send + Sync {
    fn client_for(&self, region: &Region) -> Arc<dyn SendStatisticsApi>;
}

#[derive(Debug, Clone)]
pub struct SesClientConfig {
    /// Replaces `https://email.<region>.amazonaws.com` for every region.
    pub endpoint_url: Option<String>,
    pub request_timeout: Duration,
}

impl Default for SesClientConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

pub struct HttpSesClientFactory {
    http: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    endpoint_url: Option<String>,
}

impl HttpSesClientFactory {
    pub fn new(config: SesClientConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| {
                ExporterError::InternalError(format!("failed to build http client: {err}"))
            })?;

        Ok(Self {
            http,
            credentials,
            endpoint_url: config.endpoint_url,
        })
    }
}

impl SesClientFactory for HttpSesClientFactory {
    fn client_for(&self, region: &Region) -> Arc<dyn SendStatisticsApi> {
        let endpoint = self
            .endpoint_url
            .clone()
            .unwrap_or_else(|| default_endpoint(region));

        Arc::new(HttpSesClient {
            region: region.clone(),
            endpoint,
            http: self.http.clone(),
            credentials: Arc::clone(&self.credentials),
        })
    }
}

pub struct HttpSesClient {
    region: Region,
    endpoint: String,
    http: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpSesClient {
    fn url(&self) -> Result<Url> {
        Url::parse(&self.endpoint).map_err(|err| {
            ExporterError::InvalidArgument(format!("invalid endpoint {}: {err}", self.endpoint))
        })
    }

    fn signed_headers(
        &self,
        url: &Url,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> Result<HeaderMap> {
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ExporterError::InvalidArgument(format!(
                    "endpoint has no host: {url}"
                )));
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            header::HOST,
            HeaderValue::from_str(&host).map_err(|err| {
                ExporterError::InvalidArgument(format!("invalid endpoint host {host}: {err}"))
            })?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(FORM_CONTENT_TYPE),
        );

        let scope = SigningScope {
            region: self.region.as_str(),
            service: SIGNING_SERVICE,
            time: now,
        };
        sign_request(
            credentials,
            &scope,
            "POST",
            url.path(),
            url.query().unwrap_or_default(),
            &mut headers,
            GET_SEND_STATISTICS_BODY.as_bytes(),
        )?;
        Ok(headers)
    }
}

#[async_trait]
impl SendStatisticsApi for HttpSesClient {
    async fn get_send_statistics(&self) -> Result<Vec<SendDataPoint>> {
        let credentials = self
            .credentials
            .credentials()
            .ok_or(ExporterError::MissingCredentials)?;
        let url = self.url()?;
        let headers = self.signed_headers(&url, &credentials, time::now())?;

        let response = self
            .http
            .post(url)
            .headers(headers)
            .body(GET_SEND_STATISTICS_BODY)
            .send()
            .await
            .map_err(|err| {
                ExporterError::Transport(format!(
                    "GetSendStatistics request to {} failed: {err}",
                    self.endpoint
                ))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            ExporterError::Transport(format!(
                "failed to read GetSendStatistics response from {}: {err}",
                self.endpoint
            ))
        })?;
        debug!(region = %self.region, %status, bytes = body.len(), "GetSendStatistics response");

        if !status.is_success() {
            return Err(parse_error_response(&body).unwrap_or_else(|| {
                ExporterError::Transport(format!(
                    "GetSendStatistics returned status {status} from {}",
                    self.endpoint
                ))
            }));
        }

        parse_send_statistics(&body)
    }
}

fn default_endpoint(region: &Region) -> String {
    format!("https://email.{region}.amazonaws.com/")
}
