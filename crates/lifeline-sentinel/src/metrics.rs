//! Cycle results and metric aggregation
//!
//! One [`Task`] per roster entry, settled exactly once, then folded into an
//! immutable [`CycleResult`] by the [`CycleResultBuilder`].

use crate::medic::SubsystemEndpoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

/// Revenue estimate reported by the remediation subsystems
pub const TOTAL_REVENUE: &str = "total_revenue";

/// Manual processes a subsystem reports having automated away
pub const MANUAL_PROCESSES_ELIMINATED: &str = "manual_processes_eliminated";

/// Metric name and the JSON pointer it is summed from
///
/// Several pointers may feed the same metric.
const EXTRACTION_RULES: &[(&str, &str)] = &[
    (TOTAL_REVENUE, "/total_estimated_revenue"),
    (TOTAL_REVENUE, "/report/total_revenue_estimated"),
    (MANUAL_PROCESSES_ELIMINATED, "/manual_processes_eliminated"),
];

/// Names of every aggregate metric, each present in every [`CycleResult`]
pub fn metric_names() -> impl Iterator<Item = &'static str> {
    let mut names: Vec<&'static str> = EXTRACTION_RULES.iter().map(|(name, _)| *name).collect();
    names.dedup();
    names.into_iter()
}

/// Pull the aggregate metrics out of a subsystem payload
///
/// Missing or `null` fields contribute 0. A payload that is not an object,
/// reports `success: false`, or carries a non-numeric metric field is
/// rejected with a reason.
pub fn extract_metrics(payload: &Value) -> Result<BTreeMap<&'static str, f64>, String> {
    if !payload.is_object() {
        return Err("payload is not a JSON object".to_string());
    }

    match payload.get("success") {
        None | Some(Value::Bool(true)) => {}
        Some(Value::Bool(false)) => return Err("subsystem reported success=false".to_string()),
        Some(_) => return Err("'success' is not a boolean".to_string()),
    }

    let mut metrics = BTreeMap::new();
    for (name, pointer) in EXTRACTION_RULES {
        let value = match payload.pointer(pointer) {
            None | Some(Value::Null) => 0.0,
            Some(v) => v
                .as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| format!("'{}' is not a number", pointer))?,
        };
        *metrics.entry(*name).or_insert(0.0) += value;
    }

    Ok(metrics)
}

/// Outcome of one remediation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Pending,
    Success { payload: Value },
    Failure { reason: String },
}

impl TaskOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskOutcome::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success { .. })
    }
}

/// One remediation call within a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Subsystem id
    pub id: String,

    /// Endpoint path the call was sent to
    pub endpoint: String,

    pub outcome: TaskOutcome,

    /// Wall time of the call, 0 while pending
    pub duration_ms: u64,
}

impl Task {
    /// A pending task for `endpoint`
    pub fn pending(endpoint: &SubsystemEndpoint) -> Self {
        Self {
            id: endpoint.id.clone(),
            endpoint: endpoint.path.clone(),
            outcome: TaskOutcome::Pending,
            duration_ms: 0,
        }
    }

    /// Move a pending task to a terminal outcome
    ///
    /// Returns false and leaves the task untouched if it already settled.
    pub fn settle(&mut self, outcome: TaskOutcome, elapsed: Duration) -> bool {
        if self.outcome.is_terminal() {
            return false;
        }
        self.outcome = outcome;
        self.duration_ms = elapsed.as_millis() as u64;
        true
    }
}

/// Aggregated report of one completed cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,

    /// Tasks in roster order
    pub tasks: Vec<Task>,

    pub success_count: usize,
    pub failure_count: usize,

    /// Metric name to sum over successful tasks
    pub aggregate_metrics: BTreeMap<String, f64>,
}

impl CycleResult {
    /// Successful share of tasks (0.0 - 1.0)
    pub fn success_ratio(&self) -> f64 {
        if self.tasks.is_empty() {
            1.0
        } else {
            self.success_count as f64 / self.tasks.len() as f64
        }
    }

    /// Aggregate metric by name, 0 when unknown
    pub fn metric(&self, name: &str) -> f64 {
        self.aggregate_metrics.get(name).copied().unwrap_or(0.0)
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count == 0
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        let metrics = self
            .aggregate_metrics
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "Cycle: {} tasks | {} succeeded ({:.1}%) | {} failed | {}ms | {}",
            self.tasks.len(),
            self.success_count,
            self.success_ratio() * 100.0,
            self.failure_count,
            self.duration_ms,
            metrics
        )
    }
}

/// Accumulates task outcomes while a cycle runs
#[derive(Debug)]
pub struct CycleResultBuilder {
    started_at: DateTime<Utc>,
    start_time: Instant,
    tasks: Vec<Task>,
    metrics: BTreeMap<String, f64>,
}

impl CycleResultBuilder {
    /// Start tracking a cycle over `tasks`
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            started_at: Utc::now(),
            start_time: Instant::now(),
            tasks,
            metrics: metric_names().map(|name| (name.to_string(), 0.0)).collect(),
        }
    }

    /// Settle the task at `index` from a raw call result
    ///
    /// Metrics are only summed from payloads that pass extraction. A
    /// rejected payload turns the task into a failure.
    pub fn record(&mut self, index: usize, call: Result<Value, String>, elapsed: Duration) {
        let Some(task) = self.tasks.get_mut(index) else {
            return;
        };
        if task.outcome.is_terminal() {
            return;
        }

        let outcome = match call {
            Ok(payload) => match extract_metrics(&payload) {
                Ok(extracted) => {
                    for (name, value) in extracted {
                        *self.metrics.entry(name.to_string()).or_insert(0.0) += value;
                    }
                    TaskOutcome::Success { payload }
                }
                Err(reason) => TaskOutcome::Failure { reason },
            },
            Err(reason) => TaskOutcome::Failure { reason },
        };

        task.settle(outcome, elapsed);
    }

    /// Get the tasks recorded so far (without finishing)
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Finalize the cycle
    ///
    /// Any task that never settled is recorded as a failure.
    pub fn finish(mut self) -> CycleResult {
        for task in &mut self.tasks {
            task.settle(
                TaskOutcome::Failure {
                    reason: "call never settled".to_string(),
                },
                Duration::ZERO,
            );
        }

        let success_count = self.tasks.iter().filter(|t| t.outcome.is_success()).count();
        let failure_count = self.tasks.len() - success_count;

        CycleResult {
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration_ms: self.start_time.elapsed().as_millis() as u64,
            tasks: self.tasks,
            success_count,
            failure_count,
            aggregate_metrics: self.metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roster(ids: &[&str]) -> Vec<Task> {
        ids.iter()
            .map(|id| Task::pending(&SubsystemEndpoint::new(*id, format!("/api/{}", id))))
            .collect()
    }

    #[test]
    fn test_extract_sums_both_revenue_sources() {
        let payload = json!({
            "success": true,
            "total_estimated_revenue": 100,
            "report": { "total_revenue_estimated": 25.5 },
            "manual_processes_eliminated": 3
        });

        let metrics = extract_metrics(&payload).unwrap();
        assert_eq!(metrics[TOTAL_REVENUE], 125.5);
        assert_eq!(metrics[MANUAL_PROCESSES_ELIMINATED], 3.0);
    }

    #[test]
    fn test_extract_missing_fields_count_as_zero() {
        let metrics = extract_metrics(&json!({ "success": true })).unwrap();
        assert_eq!(metrics[TOTAL_REVENUE], 0.0);
        assert_eq!(metrics[MANUAL_PROCESSES_ELIMINATED], 0.0);

        // `success` itself is optional
        assert!(extract_metrics(&json!({ "report": null })).is_ok());
    }

    #[test]
    fn test_extract_rejects_malformed() {
        assert!(extract_metrics(&json!([1, 2, 3])).is_err());
        assert!(extract_metrics(&json!({ "success": false })).is_err());
        assert!(extract_metrics(&json!({ "success": "yes" })).is_err());

        let err = extract_metrics(&json!({ "total_estimated_revenue": "lots" })).unwrap_err();
        assert!(err.contains("total_estimated_revenue"));
    }

    #[test]
    fn test_terminal_task_is_immutable() {
        let mut task = roster(&["payments"]).remove(0);
        assert!(task.settle(
            TaskOutcome::Failure {
                reason: "timeout".into()
            },
            Duration::from_millis(5)
        ));
        assert!(!task.settle(
            TaskOutcome::Success { payload: json!({}) },
            Duration::from_millis(1)
        ));

        assert!(!task.outcome.is_success());
        assert_eq!(task.duration_ms, 5);
    }

    #[test]
    fn test_builder_aggregates_successes_only() {
        let mut builder = CycleResultBuilder::new(roster(&["a", "b", "c", "d"]));

        builder.record(
            0,
            Ok(json!({ "success": true, "total_estimated_revenue": 100 })),
            Duration::from_millis(10),
        );
        builder.record(
            1,
            Ok(json!({ "success": true, "report": { "total_revenue_estimated": 50 } })),
            Duration::from_millis(10),
        );
        builder.record(2, Err("timed out after 5000ms".into()), Duration::from_secs(5));
        // Reported revenue on a failed payload must not be counted
        builder.record(
            3,
            Ok(json!({ "success": false, "total_estimated_revenue": 999 })),
            Duration::from_millis(10),
        );

        let result = builder.finish();

        assert_eq!(result.tasks.len(), 4);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 2);
        assert_eq!(result.metric(TOTAL_REVENUE), 150.0);
        assert_eq!(result.metric(MANUAL_PROCESSES_ELIMINATED), 0.0);
        assert_eq!(result.tasks[2].id, "c");
        assert!(!result.is_clean());
    }

    #[test]
    fn test_unsettled_tasks_fail_on_finish() {
        let mut builder = CycleResultBuilder::new(roster(&["a", "b"]));
        builder.record(0, Ok(json!({ "success": true })), Duration::ZERO);

        let result = builder.finish();
        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count, 1);
        assert!(result.tasks.iter().all(|t| t.outcome.is_terminal()));
    }

    #[test]
    fn test_summary() {
        let mut builder = CycleResultBuilder::new(roster(&["a", "b"]));
        builder.record(
            0,
            Ok(json!({ "total_estimated_revenue": 40 })),
            Duration::ZERO,
        );
        builder.record(1, Err("HTTP status 500".into()), Duration::ZERO);

        let summary = builder.finish().summary();
        assert!(summary.contains("2 tasks"));
        assert!(summary.contains("1 succeeded (50.0%)"));
        assert!(summary.contains("1 failed"));
        assert!(summary.contains("total_revenue=40"));
    }
}
