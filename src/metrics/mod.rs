//! In-process metrics for the CropChain gateway
//!
//! Named counters, gauges and latency histograms, exported as JSON on
//! `GET /metrics`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

/// Process-wide metrics registry
pub struct MetricsRegistry {
    counters: RwLock<BTreeMap<String, Arc<AtomicU64>>>,
    gauges: RwLock<BTreeMap<String, Arc<AtomicU64>>>,
    histograms: RwLock<BTreeMap<String, Arc<Histogram>>>,
    start_time: Instant,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(BTreeMap::new()),
            gauges: RwLock::new(BTreeMap::new()),
            histograms: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    pub async fn inc_counter(&self, name: &str) {
        self.add_counter(name, 1).await;
    }

    pub async fn add_counter(&self, name: &str, value: u64) {
        slot(&self.counters, name)
            .await
            .fetch_add(value, Ordering::Relaxed);
    }

    pub async fn set_gauge(&self, name: &str, value: u64) {
        slot(&self.gauges, name).await.store(value, Ordering::Relaxed);
    }

    pub async fn get_counter(&self, name: &str) -> u64 {
        read(&self.counters, name).await
    }

    pub async fn get_gauge(&self, name: &str) -> u64 {
        read(&self.gauges, name).await
    }

    /// Record a latency observation in seconds.
    pub async fn observe_histogram(&self, name: &str, seconds: f64) {
        let existing = self.histograms.read().await.get(name).cloned();
        let histogram = match existing {
            Some(h) => h,
            None => self
                .histograms
                .write()
                .await
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Histogram::default()))
                .clone(),
        };
        histogram.observe(seconds);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub async fn to_json(&self) -> serde_json::Value {
        let counters: BTreeMap<String, u64> = self
            .counters
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();
        let gauges: BTreeMap<String, u64> = self
            .gauges
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();
        let histograms: BTreeMap<String, serde_json::Value> = self
            .histograms
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();

        serde_json::json!({
            "uptime_seconds": self.uptime_seconds(),
            "counters": counters,
            "gauges": gauges,
            "histograms": histograms,
        })
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn slot(map: &RwLock<BTreeMap<String, Arc<AtomicU64>>>, name: &str) -> Arc<AtomicU64> {
    if let Some(existing) = map.read().await.get(name) {
        return existing.clone();
    }
    map.write()
        .await
        .entry(name.to_string())
        .or_insert_with(|| Arc::new(AtomicU64::new(0)))
        .clone()
}

async fn read(map: &RwLock<BTreeMap<String, Arc<AtomicU64>>>, name: &str) -> u64 {
    map.read()
        .await
        .get(name)
        .map(|v| v.load(Ordering::Relaxed))
        .unwrap_or(0)
}

/// Fixed-bucket latency histogram
pub struct Histogram {
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    /// Sum in microseconds
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(buckets: Vec<f64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, seconds: f64) {
        self.sum_micros
            .fetch_add((seconds * 1_000_000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        if let Some(i) = self.buckets.iter().position(|b| seconds <= *b) {
            self.counts[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let counts: Vec<u64> = self
            .counts
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect();
        serde_json::json!({
            "buckets": self.buckets,
            "counts": counts,
            "sum": self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            "count": self.count.load(Ordering::Relaxed),
        })
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // Ledger commits take seconds, so the buckets reach further than a
        // typical request histogram.
        Self::new(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])
    }
}

/// Predefined metric names
pub mod metric_names {
    // Connection lifecycle
    pub const CONNECT_ATTEMPTS: &str = "cropchain.connect.attempts";
    pub const CONNECT_FAILURES: &str = "cropchain.connect.failures";
    pub const CONNECT_GENERATION: &str = "cropchain.connect.generation";

    // Ledger traffic
    pub const LEDGER_SUBMISSIONS: &str = "cropchain.ledger.submissions";
    pub const LEDGER_SUBMISSION_FAILURES: &str = "cropchain.ledger.submission_failures";
    pub const LEDGER_QUERIES: &str = "cropchain.ledger.queries";
    pub const LEDGER_QUERY_FAILURES: &str = "cropchain.ledger.query_failures";
    pub const LEDGER_SUBMIT_LATENCY: &str = "cropchain.ledger.submit_latency_seconds";

    // Off-chain
    pub const PARTIAL_WRITES: &str = "cropchain.projection.partial_writes";
    pub const UPLOADS: &str = "cropchain.content.uploads";

    pub const NOT_READY_REJECTIONS: &str = "cropchain.requests.not_ready";
}

/// Time an async operation into a histogram.
pub async fn timed<F, T>(metrics: &MetricsRegistry, metric_name: &str, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let result = f.await;
    metrics
        .observe_histogram(metric_name, start.elapsed().as_secs_f64())
        .await;
    result
}
