//! mesos-gather — concurrent collection of Mesos metrics snapshots.
//!
//! Polls `/metrics/snapshot` on a set of Mesos masters and agents, turns
//! each JSON snapshot into tagged samples, and hands them to a sink. A
//! batch fails fast: the first endpoint error ends the call.
//!
//! # Architecture
//!
//! ```text
//! BatchCollector::collect(addresses, sink)
//!   ├── Endpoint::parse()          every address, before any request
//!   └── one task per endpoint
//!       ├── TagSet::for_endpoint() {host, port}
//!       ├── SnapshotFetcher::fetch() GET + JSON decode
//!       └── MetricsSink::append()  per metric, `/` → `_`
//! ```

pub mod collector;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod sink;
pub mod tags;

pub use collector::{normalize_metric_name, BatchCollector, BatchSummary};
pub use config::{GatherConfig, DESCRIPTION, SAMPLE_CONFIG};
pub use endpoint::Endpoint;
pub use error::{ClientError, CollectError, CollectResult, FetchError, FetchErrorKind, ResolutionError};
pub use fetch::{FetchConfig, MetricSnapshot, SnapshotFetcher};
pub use sink::{MemorySink, MetricsSink, Sample};
pub use tags::{HostnameProvider, SystemHostname, TagSet};
