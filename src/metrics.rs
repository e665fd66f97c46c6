//! Metrics collection and export module

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // View rounds
    pub rounds_started: IntCounter,
    pub rounds_applied: IntCounter,
    pub rounds_superseded: IntCounter,
    pub rounds_failed: IntCounter,

    // Purchases
    pub purchases_attempted: IntCounter,
    pub purchases_succeeded: IntCounter,
    pub purchases_failed: IntCounter,
    pub purchases_rejected_busy: IntCounter,
    pub purchases_fallback_payment: IntCounter,

    // Histograms
    pub view_round_latency: Histogram,
    pub purchase_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let rounds_started = IntCounter::with_opts(Opts::new(
            "view_rounds_started_total",
            "Number of price/supply view rounds issued",
        ))?;

        let rounds_applied = IntCounter::with_opts(Opts::new(
            "view_rounds_applied_total",
            "Number of view rounds whose result was applied",
        ))?;

        let rounds_superseded = IntCounter::with_opts(Opts::new(
            "view_rounds_superseded_total",
            "Number of view rounds discarded because a newer round started",
        ))?;

        let rounds_failed = IntCounter::with_opts(Opts::new(
            "view_rounds_failed_total",
            "Number of latest view rounds that failed and reset the quote",
        ))?;

        let purchases_attempted = IntCounter::with_opts(Opts::new(
            "purchases_attempted_total",
            "Number of purchase transactions handed to the wallet",
        ))?;

        let purchases_succeeded = IntCounter::with_opts(Opts::new(
            "purchases_succeeded_total",
            "Number of purchase transactions accepted",
        ))?;

        let purchases_failed = IntCounter::with_opts(Opts::new(
            "purchases_failed_total",
            "Number of purchase transactions rejected by wallet or node",
        ))?;

        let purchases_rejected_busy = IntCounter::with_opts(Opts::new(
            "purchases_rejected_busy_total",
            "Number of purchase triggers ignored while another purchase was in flight",
        ))?;

        let purchases_fallback_payment = IntCounter::with_opts(Opts::new(
            "purchases_fallback_payment_total",
            "Number of purchases priced with the fallback unit payment",
        ))?;

        let view_round_latency = Histogram::with_opts(
            HistogramOpts::new("view_round_latency_seconds", "Price/supply view round latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        )?;

        let purchase_latency = Histogram::with_opts(
            HistogramOpts::new("purchase_latency_seconds", "Wallet sign-and-submit latency")
                .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(rounds_started.clone()))?;
        registry.register(Box::new(rounds_applied.clone()))?;
        registry.register(Box::new(rounds_superseded.clone()))?;
        registry.register(Box::new(rounds_failed.clone()))?;
        registry.register(Box::new(purchases_attempted.clone()))?;
        registry.register(Box::new(purchases_succeeded.clone()))?;
        registry.register(Box::new(purchases_failed.clone()))?;
        registry.register(Box::new(purchases_rejected_busy.clone()))?;
        registry.register(Box::new(purchases_fallback_payment.clone()))?;
        registry.register(Box::new(view_round_latency.clone()))?;
        registry.register(Box::new(purchase_latency.clone()))?;

        Ok(Self {
            registry,
            rounds_started,
            rounds_applied,
            rounds_superseded,
            rounds_failed,
            purchases_attempted,
            purchases_succeeded,
            purchases_failed,
            purchases_rejected_busy,
            purchases_fallback_payment,
            view_round_latency,
            purchase_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all registered metrics in the Prometheus text format
    pub fn export_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let m = metrics();
        let before = m.rounds_started.get();
        m.rounds_started.inc();
        assert!(m.rounds_started.get() > before);
    }

    #[test]
    fn test_export_contains_metric_names() {
        let m = metrics();
        m.purchases_attempted.inc();
        let text = m.export_text().unwrap();
        assert!(text.contains("purchases_attempted_total"));
        assert!(text.contains("view_round_latency_seconds"));
    }

    #[test]
    fn test_timer_records() {
        let m = Metrics::new().unwrap();
        let timer = Timer::new();
        timer.observe_duration(&m.view_round_latency);
        assert_eq!(m.view_round_latency.get_sample_count(), 1);
    }
}
