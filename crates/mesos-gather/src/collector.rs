//! Batch collection across all configured endpoints.
//!
//! Every address is resolved up front; a malformed one fails the call
//! before any request goes out. Each endpoint then gets its own spawned
//! task that fetches, tags, and appends its samples. The call returns as
//! soon as every task has succeeded or the first one has failed.
//!
//! When several endpoints fail, whichever error reaches the collector
//! first is returned and the rest are dropped. Samples from endpoints that
//! finished before the failure stay in the sink.
//!
//! Tasks are detached. By default they keep running after an early return
//! and may still append. With [`BatchCollector::with_cancel_on_error`] the
//! collector signals them to stop: an in-flight fetch is abandoned and no
//! further samples are appended.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::endpoint::{resolve_all, Endpoint};
use crate::error::{CollectError, CollectResult, FetchError};
use crate::fetch::SnapshotFetcher;
use crate::sink::MetricsSink;
use crate::tags::{HostnameProvider, SystemHostname, TagSet};

/// Outcome of a successful cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub endpoints: usize,
    pub samples: usize,
}

/// Replace path separators so `memory/used` becomes `memory_used`.
pub fn normalize_metric_name(name: &str) -> String {
    name.replace('/', "_")
}

/// Fans a snapshot fetch out over a list of addresses.
#[derive(Clone)]
pub struct BatchCollector {
    fetcher: SnapshotFetcher,
    hostname: Arc<dyn HostnameProvider>,
    cancel_on_error: bool,
}

impl BatchCollector {
    pub fn new(fetcher: SnapshotFetcher) -> Self {
        Self {
            fetcher,
            hostname: Arc::new(SystemHostname),
            cancel_on_error: false,
        }
    }

    /// Use a different source for the `host` tag.
    pub fn with_hostname(mut self, provider: Arc<dyn HostnameProvider>) -> Self {
        self.hostname = provider;
        self
    }

    /// Stop outstanding tasks when the batch fails early.
    pub fn with_cancel_on_error(mut self, enabled: bool) -> Self {
        self.cancel_on_error = enabled;
        self
    }

    /// Run one collection cycle.
    pub async fn collect<I, S>(
        &self,
        addresses: I,
        sink: Arc<dyn MetricsSink>,
    ) -> CollectResult<BatchSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = resolve_all(addresses)?;
        let mut summary = BatchSummary {
            endpoints: endpoints.len(),
            samples: 0,
        };
        if endpoints.is_empty() {
            return Ok(summary);
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Result<usize, FetchError>)>();
        let (stop_tx, stop_rx) = watch::channel(false);

        for (index, endpoint) in endpoints.iter().cloned().enumerate() {
            let tx = tx.clone();
            let fetcher = self.fetcher.clone();
            let hostname = self.hostname.clone();
            let sink = sink.clone();
            let stop = self.cancel_on_error.then(|| stop_rx.clone());

            tokio::spawn(async move {
                let outcome = gather_endpoint(&fetcher, &endpoint, hostname.as_ref(), sink.as_ref(), stop).await;
                // The collector may already have returned.
                let _ = tx.send((index, outcome));
            });
        }
        drop(tx);

        let mut reported = vec![false; endpoints.len()];
        let mut pending = endpoints.len();
        while pending > 0 {
            match rx.recv().await {
                Some((index, Ok(count))) => {
                    reported[index] = true;
                    summary.samples += count;
                    pending -= 1;
                }
                Some((index, Err(e))) => {
                    debug!(endpoint = %endpoints[index], error = %e, pending = pending - 1, "batch failed");
                    if self.cancel_on_error {
                        let _ = stop_tx.send(true);
                    }
                    return Err(e.into());
                }
                None => {
                    let lost = reported.iter().position(|r| !r).unwrap_or(0);
                    if self.cancel_on_error {
                        let _ = stop_tx.send(true);
                    }
                    return Err(CollectError::WorkerLost {
                        endpoint: endpoints[lost].to_string(),
                    });
                }
            }
        }

        debug!(endpoints = summary.endpoints, samples = summary.samples, "batch collected");
        Ok(summary)
    }
}

/// Fetch one endpoint and append its samples. Returns the number appended.
async fn gather_endpoint(
    fetcher: &SnapshotFetcher,
    endpoint: &Endpoint,
    hostname: &dyn HostnameProvider,
    sink: &dyn MetricsSink,
    mut stop: Option<watch::Receiver<bool>>,
) -> Result<usize, FetchError> {
    let tags = TagSet::for_endpoint(endpoint, hostname);

    let snapshot = match stop.as_mut() {
        Some(rx) => tokio::select! {
            res = fetcher.fetch(endpoint) => res?,
            _ = rx.wait_for(|s| *s) => {
                debug!(%endpoint, "fetch abandoned, batch already failed");
                return Ok(0);
            }
        },
        None => fetcher.fetch(endpoint).await?,
    };

    let mut appended = 0;
    for (name, value) in snapshot {
        if let Some(rx) = stop.as_ref() {
            if stopped(rx) {
                debug!(%endpoint, appended, "append stopped, batch already failed");
                break;
            }
        }
        sink.append(&normalize_metric_name(&name), value, &tags);
        appended += 1;
    }
    Ok(appended)
}

/// True once the stop flag is set or the collector has gone away.
fn stopped(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow() || rx.has_changed().is_err()
}
