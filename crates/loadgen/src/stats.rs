use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const TOTAL_ROW: &str = "Aggregated";

#[derive(Debug, Default)]
pub struct Stats {
    entries: Mutex<BTreeMap<String, Entry>>,
}

#[derive(Debug, Clone, Default)]
struct Entry {
    requests: u64,
    failures: u64,
    total_ms: f64,
    min_ms: Option<f64>,
    max_ms: f64,
}

impl Entry {
    fn add(&mut self, elapsed_ms: f64, ok: bool) {
        self.requests += 1;
        if !ok {
            self.failures += 1;
        }
        self.total_ms += elapsed_ms;
        self.min_ms = Some(self.min_ms.map_or(elapsed_ms, |m| m.min(elapsed_ms)));
        self.max_ms = self.max_ms.max(elapsed_ms);
    }

    fn merge(&mut self, other: &Entry) {
        self.requests += other.requests;
        self.failures += other.failures;
        self.total_ms += other.total_ms;
        self.min_ms = match (self.min_ms, other.min_ms) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_ms = self.max_ms.max(other.max_ms);
    }

    fn summary(&self, name: &str) -> RequestStats {
        RequestStats {
            name: name.to_string(),
            requests: self.requests,
            failures: self.failures,
            min_ms: self.min_ms.unwrap_or(0.0),
            avg_ms: if self.requests == 0 {
                0.0
            } else {
                self.total_ms / self.requests as f64
            },
            max_ms: self.max_ms,
        }
    }
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str, elapsed: Duration, ok: bool) {
        if let Ok(mut entries) = self.entries.lock() {
            entries
                .entry(name.to_string())
                .or_default()
                .add(elapsed.as_secs_f64() * 1000.0, ok);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let entries = self
            .entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default();

        let mut total = Entry::default();
        let rows = entries
            .iter()
            .map(|(name, entry)| {
                total.merge(entry);
                entry.summary(name)
            })
            .collect();

        StatsSnapshot {
            entries: rows,
            total: total.summary(TOTAL_ROW),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestStats {
    pub name: String,
    pub requests: u64,
    pub failures: u64,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsSnapshot {
    pub entries: Vec<RequestStats>,
    pub total: RequestStats,
}

impl StatsSnapshot {
    pub fn get(&self, name: &str) -> Option<&RequestStats> {
        self.entries.iter().find(|e| e.name == name)
    }
}
