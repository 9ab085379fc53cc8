//! Stdout sink for collected samples.

use std::io::Write;

use clap::ValueEnum;
use mesos_gather::{MetricsSink, Sample, TagSet};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `name value host=<h> port=<p>`
    Text,
    /// One JSON object per line
    Json,
}

/// Writes each sample to stdout as soon as it is appended.
pub struct StdoutSink {
    format: OutputFormat,
}

impl StdoutSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl MetricsSink for StdoutSink {
    fn append(&self, name: &str, value: f64, tags: &TagSet) {
        let line = format_sample(self.format, name, value, tags);
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}") {
            warn!(error = %e, metric = name, "failed to write sample");
        }
    }
}

pub fn format_sample(format: OutputFormat, name: &str, value: f64, tags: &TagSet) -> String {
    match format {
        OutputFormat::Text => {
            let tags: Vec<String> = tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{name} {value} {}", tags.join(" "))
        }
        OutputFormat::Json => {
            let sample = Sample {
                name: name.to_string(),
                value,
                tags: tags.clone(),
            };
            serde_json::to_string(&sample).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags() -> TagSet {
        TagSet {
            host: "agent-1".to_string(),
            port: "5051".to_string(),
        }
    }

    #[test]
    fn text_line() {
        assert_eq!(
            format_sample(OutputFormat::Text, "slave_mem_used", 1024.0, &tags()),
            "slave_mem_used 1024 host=agent-1 port=5051"
        );
    }

    #[test]
    fn json_line() {
        let line = format_sample(OutputFormat::Json, "uptime", 1.5, &tags());
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["name"], "uptime");
        assert_eq!(parsed["value"], 1.5);
        assert_eq!(parsed["tags"]["host"], "agent-1");
        assert_eq!(parsed["tags"]["port"], "5051");
    }
}
