//! `mesos-gather gather` and `mesos-gather run`.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use mesos_gather::{BatchCollector, GatherConfig, MetricsSink};
use tracing::{error, info};

use crate::output::{OutputFormat, StdoutSink};

fn load(config_path: &str) -> Result<(GatherConfig, BatchCollector)> {
    let config = GatherConfig::from_file(Path::new(config_path))
        .with_context(|| format!("loading {config_path}"))?;
    let collector = config.build_collector()?;
    Ok((config, collector))
}

/// One cycle; a batch failure becomes the command's error.
pub async fn gather(config_path: &str, format: OutputFormat) -> Result<()> {
    let (config, collector) = load(config_path)?;
    let sink: Arc<dyn MetricsSink> = Arc::new(StdoutSink::new(format));

    let started = Instant::now();
    let summary = collector
        .collect(&config.urls, sink)
        .await
        .context("collection failed")?;
    info!(
        endpoints = summary.endpoints,
        samples = summary.samples,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "gather complete"
    );
    Ok(())
}

/// Gather every `interval` until Ctrl-C.
pub async fn run(config_path: &str, format: OutputFormat) -> Result<()> {
    let (config, collector) = load(config_path)?;
    let sink: Arc<dyn MetricsSink> = Arc::new(StdoutSink::new(format));

    let mut interval = tokio::time::interval(config.interval()?);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(endpoints = config.urls.len(), interval = %config.interval, "collection loop started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match collector.collect(&config.urls, sink.clone()).await {
                    Ok(summary) => info!(
                        endpoints = summary.endpoints,
                        samples = summary.samples,
                        "gather complete"
                    ),
                    Err(e) => error!(error = %e, "gather failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }
    Ok(())
}
