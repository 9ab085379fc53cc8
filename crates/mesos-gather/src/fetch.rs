//! Snapshot fetching.
//!
//! One GET per call against `{endpoint}/metrics/snapshot`, bounded by a
//! response-header deadline. The body is read through a size limit and
//! decoded as a flat JSON object of numbers. `https://` endpoints go
//! through rustls with the Mozilla root store.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{ClientError, FetchError};

pub const DEFAULT_METRICS_PATH: &str = "/metrics/snapshot";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Settings shared by every request a [`SnapshotFetcher`] makes.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Deadline for the response headers, per request.
    pub timeout: Duration,
    pub metrics_path: String,
    pub max_body_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            user_agent: concat!("mesos-gather/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Metric name → value, as returned by one endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSnapshot(BTreeMap<String, f64>);

impl MetricSnapshot {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl IntoIterator for MetricSnapshot {
    type Item = (String, f64);
    type IntoIter = std::collections::btree_map::IntoIter<String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, f64)> for MetricSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// HTTP client for metrics snapshots. Build one and share it across
/// endpoints; the connection pool lives inside.
#[derive(Clone)]
pub struct SnapshotFetcher {
    client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    config: FetchConfig,
}

impl SnapshotFetcher {
    /// Build a fetcher that trusts the Mozilla root certificate store.
    pub fn new(config: FetchConfig) -> Result<Self, ClientError> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let tls = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        Ok(Self::with_tls(config, Arc::new(tls)))
    }

    /// Build a fetcher with a caller-supplied TLS configuration.
    pub fn with_tls(config: FetchConfig, tls: Arc<rustls::ClientConfig>) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(config.timeout));

        let connector = HttpsConnectorBuilder::new()
            .with_tls_config((*tls).clone())
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch and decode the snapshot of one endpoint.
    pub async fn fetch(&self, endpoint: &Endpoint) -> Result<MetricSnapshot, FetchError> {
        let base = endpoint.base_url();
        let url = endpoint.url_for(&self.config.metrics_path);
        let transport = |reason: String| FetchError::Transport {
            endpoint: base.clone(),
            reason,
        };

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(&url)
            .header(http::header::USER_AGENT, &self.config.user_agent)
            .header(http::header::ACCEPT, "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| transport(e.to_string()))?;

        let pending = tokio::time::timeout(self.config.timeout, self.client.request(req));
        let resp: http::Response<Incoming> = match pending.await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                debug!(error = %e, %url, "snapshot request failed");
                return Err(transport(error_chain(&e)));
            }
            Err(_) => {
                debug!(%url, timeout = ?self.config.timeout, "snapshot request timed out");
                return Err(transport(format!(
                    "no response headers within {:?}",
                    self.config.timeout
                )));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            debug!(%status, %url, "snapshot request non-2xx");
            return Err(FetchError::Status {
                endpoint: base.clone(),
                status,
            });
        }

        let body = match Limited::new(resp.into_body(), self.config.max_body_bytes)
            .collect()
            .await
        {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                return Err(FetchError::Decode {
                    endpoint: base.clone(),
                    reason: format!("body exceeds {} bytes", self.config.max_body_bytes),
                });
            }
            Err(e) => return Err(transport(format!("reading body: {}", error_chain(&*e)))),
        };

        let snapshot = decode_snapshot(&base, &body)?;
        debug!(%url, metrics = snapshot.len(), "snapshot fetched");
        Ok(snapshot)
    }
}

/// Decode a response body into a snapshot. Every value must be a JSON
/// number; the first value that is not rejects the whole body.
pub fn decode_snapshot(endpoint: &str, body: &[u8]) -> Result<MetricSnapshot, FetchError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| FetchError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(FetchError::Decode {
                endpoint: endpoint.to_string(),
                reason: format!("expected a JSON object, found {}", json_type(&other)),
            });
        }
    };

    map.into_iter()
        .map(|(name, value)| match value.as_f64() {
            Some(v) => Ok((name, v)),
            None => Err(FetchError::TypeMismatch {
                endpoint: endpoint.to_string(),
                metric: name,
                found: json_type(&value),
            }),
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render an error with its source chain, `outer: inner: root`.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        out.push_str(": ");
        out.push_str(&e.to_string());
        source = e.source();
    }
    out
}
