//! The accumulator that receives samples.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::tags::TagSet;

/// Receives one sample at a time, possibly from many tasks at once.
pub trait MetricsSink: Send + Sync {
    fn append(&self, name: &str, value: f64, tags: &TagSet);
}

impl<S: MetricsSink + ?Sized> MetricsSink for Arc<S> {
    fn append(&self, name: &str, value: f64, tags: &TagSet) {
        (**self).append(name, value, tags)
    }
}

/// A single tagged metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub name: String,
    pub value: f64,
    pub tags: TagSet,
}

/// Keeps every appended sample in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    samples: Mutex<Vec<Sample>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of everything appended so far.
    pub fn samples(&self) -> Vec<Sample> {
        self.lock().clone()
    }

    /// Remove and return everything appended so far.
    pub fn drain(&self) -> Vec<Sample> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sample>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MetricsSink for MemorySink {
    fn append(&self, name: &str, value: f64, tags: &TagSet) {
        self.lock().push(Sample {
            name: name.to_string(),
            value,
            tags: tags.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags() -> TagSet {
        TagSet {
            host: "h".to_string(),
            port: "5050".to_string(),
        }
    }

    #[test]
    fn memory_sink_records_and_drains() {
        let sink = MemorySink::new();
        sink.append("master_cpus_total", 4.0, &tags());
        sink.append("uptime", 12.5, &tags());
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.samples()[1].name, "uptime");

        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn arc_forwards_to_inner_sink() {
        let sink = Arc::new(MemorySink::new());
        let dyn_sink: Arc<dyn MetricsSink> = sink.clone();
        dyn_sink.append("x", 1.0, &tags());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let sink = Arc::new(MemorySink::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        sink.append(&format!("m{i}_{j}"), j as f64, &tags());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.len(), 800);
    }
}
