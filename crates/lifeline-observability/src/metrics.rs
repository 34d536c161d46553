//! Prometheus metrics for Lifeline operations
//!
//! Collectors are registered once in a lazily built global registry. The
//! recording helpers are cheap and safe to call from any task.

use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry,
};
use std::sync::OnceLock;

/// Global Prometheus registry for Lifeline metrics
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Get or initialize the global registry
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let r = Registry::new();
        register_metrics(&r);
        r
    })
}

/// Sampler outcomes
///
/// Labels: outcome (healthy, depressed, skipped)
pub static SAMPLES_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Hysteresis trigger outcomes
///
/// Labels: outcome (fired, suppressed)
pub static TRIGGERS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Orchestrator cycle outcomes
///
/// Labels: outcome (completed, rejected)
pub static CYCLES_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Per-subsystem task outcomes
///
/// Labels: subsystem, outcome (success, failure)
pub static TASKS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Cycle wall-clock duration
///
/// Buckets: 100ms .. 60s
pub static CYCLE_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

/// 1 while a cycle is in flight
pub static CYCLE_ACTIVE: OnceLock<Gauge> = OnceLock::new();

/// Aggregate metrics of the last completed cycle
///
/// Labels: metric
pub static LAST_CYCLE_METRIC: OnceLock<GaugeVec> = OnceLock::new();

/// Status poll emissions
pub static STATUS_POLLS_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    let samples = CounterVec::new(
        Opts::new("lifeline_samples_total", "Sampler readings by outcome"),
        &["outcome"],
    )
    .expect("Failed to create samples metric");
    registry
        .register(Box::new(samples.clone()))
        .expect("Failed to register samples");
    SAMPLES_TOTAL.set(samples).ok();

    let triggers = CounterVec::new(
        Opts::new("lifeline_triggers_total", "Hysteresis triggers by outcome"),
        &["outcome"],
    )
    .expect("Failed to create triggers metric");
    registry
        .register(Box::new(triggers.clone()))
        .expect("Failed to register triggers");
    TRIGGERS_TOTAL.set(triggers).ok();

    let cycles = CounterVec::new(
        Opts::new("lifeline_cycles_total", "Orchestrator cycles by outcome"),
        &["outcome"],
    )
    .expect("Failed to create cycles metric");
    registry
        .register(Box::new(cycles.clone()))
        .expect("Failed to register cycles");
    CYCLES_TOTAL.set(cycles).ok();

    let tasks = CounterVec::new(
        Opts::new("lifeline_tasks_total", "Remediation tasks by subsystem and outcome"),
        &["subsystem", "outcome"],
    )
    .expect("Failed to create tasks metric");
    registry
        .register(Box::new(tasks.clone()))
        .expect("Failed to register tasks");
    TASKS_TOTAL.set(tasks).ok();

    let duration = HistogramVec::new(
        HistogramOpts::new("lifeline_cycle_duration_seconds", "Cycle execution time")
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["outcome"],
    )
    .expect("Failed to create cycle_duration metric");
    registry
        .register(Box::new(duration.clone()))
        .expect("Failed to register cycle_duration");
    CYCLE_DURATION_SECONDS.set(duration).ok();

    let active = Gauge::with_opts(Opts::new(
        "lifeline_cycle_active",
        "Whether an orchestrator cycle is in flight",
    ))
    .expect("Failed to create cycle_active metric");
    registry
        .register(Box::new(active.clone()))
        .expect("Failed to register cycle_active");
    CYCLE_ACTIVE.set(active).ok();

    let last = GaugeVec::new(
        Opts::new(
            "lifeline_last_cycle_metric",
            "Aggregate metrics of the last completed cycle",
        ),
        &["metric"],
    )
    .expect("Failed to create last_cycle_metric metric");
    registry
        .register(Box::new(last.clone()))
        .expect("Failed to register last_cycle_metric");
    LAST_CYCLE_METRIC.set(last).ok();

    let polls = IntCounter::with_opts(Opts::new(
        "lifeline_status_polls_total",
        "Number of status reports emitted",
    ))
    .expect("Failed to create status_polls metric");
    registry
        .register(Box::new(polls.clone()))
        .expect("Failed to register status_polls");
    STATUS_POLLS_TOTAL.set(polls).ok();
}

/// Count one sampler outcome
pub fn inc_sample(outcome: &str) {
    registry();
    if let Some(counter) = SAMPLES_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Count one trigger outcome
pub fn inc_trigger(outcome: &str) {
    registry();
    if let Some(counter) = TRIGGERS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Count a rejected cycle
pub fn inc_cycle_rejected() {
    registry();
    if let Some(counter) = CYCLES_TOTAL.get() {
        counter.with_label_values(&["rejected"]).inc();
    }
}

/// Record a completed cycle with its duration
pub fn record_cycle_completed(duration_secs: f64) {
    registry();
    if let Some(counter) = CYCLES_TOTAL.get() {
        counter.with_label_values(&["completed"]).inc();
    }
    if let Some(histogram) = CYCLE_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&["completed"])
            .observe(duration_secs);
    }
}

/// Count one task outcome for a subsystem
pub fn inc_task(subsystem: &str, success: bool) {
    registry();
    if let Some(counter) = TASKS_TOTAL.get() {
        let outcome = if success { "success" } else { "failure" };
        counter.with_label_values(&[subsystem, outcome]).inc();
    }
}

/// Flip the cycle-active gauge
pub fn set_cycle_active(active: bool) {
    registry();
    if let Some(gauge) = CYCLE_ACTIVE.get() {
        gauge.set(if active { 1.0 } else { 0.0 });
    }
}

/// Publish the last cycle's aggregate metrics
pub fn set_last_cycle_metrics<'a>(metrics: impl IntoIterator<Item = (&'a String, &'a f64)>) {
    registry();
    if let Some(gauge) = LAST_CYCLE_METRIC.get() {
        for (name, value) in metrics {
            gauge.with_label_values(&[name.as_str()]).set(*value);
        }
    }
}

/// Count one status report
pub fn inc_status_poll() {
    registry();
    if let Some(counter) = STATUS_POLLS_TOTAL.get() {
        counter.inc();
    }
}

/// Get metrics in Prometheus text format
pub fn gather_text() -> String {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = Vec::new();

    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_registry_initialization() {
        let reg = registry();
        // Families without samples are omitted, so record one first
        inc_status_poll();
        assert!(!reg.gather().is_empty());
    }

    #[test]
    fn test_counters_render() {
        inc_sample("skipped");
        inc_trigger("fired");
        inc_cycle_rejected();
        inc_task("payments", false);

        let output = gather_text();
        assert!(output.contains("lifeline_samples_total"));
        assert!(output.contains("lifeline_triggers_total"));
        assert!(output.contains("lifeline_cycles_total"));
        assert!(output.contains(r#"subsystem="payments""#));
    }

    #[test]
    fn test_cycle_gauges() {
        set_cycle_active(true);
        record_cycle_completed(1.5);
        set_cycle_active(false);

        let mut metrics = BTreeMap::new();
        metrics.insert("total_revenue".to_string(), 150.0);
        set_last_cycle_metrics(&metrics);

        let output = gather_text();
        assert!(output.contains("lifeline_cycle_duration_seconds"));
        assert!(output.contains(r#"lifeline_last_cycle_metric{metric="total_revenue"} 150"#));
    }
}
