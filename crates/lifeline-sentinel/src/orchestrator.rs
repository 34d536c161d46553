//! Automation orchestrator: one remediation cycle across every subsystem
//!
//! ```text
//! activate_all()
//!     │
//!     ├─ single-flight admission ── busy ──> Err(AdmissionRejected)
//!     │
//!     ├─ invoke ×N concurrently, one task each, bounded by call_timeout
//!     │      (settle-all: no failure or panic cancels a sibling)
//!     │
//!     └─ aggregate in roster order ──> CycleResult
//! ```

use crate::error::SentinelError;
use crate::medic::{SubsystemEndpoint, SubsystemInvoker};
use crate::metrics::{CycleResult, CycleResultBuilder, Task, TaskOutcome};
use crate::policy::OrchestratorPolicy;
use crate::reactor::{Reactor, TriggerContext};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use lifeline_core_resilience::SingleFlight;
use lifeline_observability::{metrics, EventPayload, EventSink};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Read-only view of the orchestrator
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub timestamp: DateTime<Utc>,

    /// A cycle is in flight right now
    pub active: bool,

    pub cycles_completed: u64,
    pub cycles_rejected: u64,

    /// Subsystem ids in roster order
    pub roster: Vec<String>,

    pub last_cycle: Option<CycleResult>,
}

impl OrchestratorStatus {
    /// Format a one-line status report
    pub fn summary(&self) -> String {
        let last = match self.last_cycle {
            Some(ref cycle) => format!(
                "last: {}/{} ok",
                cycle.success_count,
                cycle.tasks.len()
            ),
            None => "last: none".to_string(),
        };
        format!(
            "Status: {} subsystems | active: {} | cycles: {} completed, {} rejected | {}",
            self.roster.len(),
            self.active,
            self.cycles_completed,
            self.cycles_rejected,
            last
        )
    }
}

/// Fans a remediation cycle out to the roster
pub struct AutomationOrchestrator {
    roster: Vec<SubsystemEndpoint>,
    invoker: Arc<dyn SubsystemInvoker>,
    policy: OrchestratorPolicy,
    sink: Arc<dyn EventSink>,
    flight: SingleFlight,
    last_cycle: RwLock<Option<CycleResult>>,
    cycles_completed: AtomicU64,
    cycles_rejected: AtomicU64,
}

impl AutomationOrchestrator {
    /// Create an orchestrator for `roster`
    ///
    /// # Errors
    ///
    /// Rejects an invalid policy, an empty roster and duplicate ids.
    pub fn new(
        roster: Vec<SubsystemEndpoint>,
        invoker: Arc<dyn SubsystemInvoker>,
        policy: OrchestratorPolicy,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, SentinelError> {
        policy.validate()?;

        if roster.is_empty() {
            return Err(SentinelError::InvalidPolicy(
                "subsystem roster is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for endpoint in &roster {
            if !seen.insert(endpoint.id.as_str()) {
                return Err(SentinelError::InvalidPolicy(format!(
                    "duplicate subsystem id '{}'",
                    endpoint.id
                )));
            }
        }

        Ok(Self {
            roster,
            invoker,
            policy,
            sink,
            flight: SingleFlight::new(),
            last_cycle: RwLock::new(None),
            cycles_completed: AtomicU64::new(0),
            cycles_rejected: AtomicU64::new(0),
        })
    }

    pub fn roster(&self) -> &[SubsystemEndpoint] {
        &self.roster
    }

    pub fn is_active(&self) -> bool {
        self.flight.is_active()
    }

    /// Run one remediation cycle
    ///
    /// Returns immediately with [`SentinelError::AdmissionRejected`] while
    /// another cycle is active; no task is created and no call is made.
    pub async fn activate_all(&self) -> Result<CycleResult, SentinelError> {
        let Some(_permit) = self.flight.try_acquire() else {
            self.cycles_rejected.fetch_add(1, Ordering::Relaxed);
            metrics::inc_cycle_rejected();
            self.sink.record_event(EventPayload::CycleRejected);
            info!("⏭️  Orchestrator: cycle already active, request rejected");
            return Err(SentinelError::AdmissionRejected);
        };

        let _active = CycleActive::enter();
        info!(
            "🚀 Orchestrator: activating {} subsystems",
            self.roster.len()
        );

        let mut builder = CycleResultBuilder::new(self.roster.iter().map(Task::pending).collect());
        let started = Instant::now();

        // One task per call: a panicking invoker only fails its own task
        let timeout = self.policy.call_timeout();
        let handles: Vec<JoinHandle<(Result<Value, String>, Duration)>> = self
            .roster
            .iter()
            .map(|endpoint| {
                let invoker = self.invoker.clone();
                let endpoint = endpoint.clone();
                tokio::spawn(
                    async move { invoke_bounded(invoker.as_ref(), &endpoint, timeout).await },
                )
            })
            .collect();
        let _calls = AbortOnDrop(handles.iter().map(JoinHandle::abort_handle).collect());
        let settled = join_all(handles).await;

        for (index, joined) in settled.into_iter().enumerate() {
            let (call, elapsed) = match joined {
                Ok(settled) => settled,
                Err(e) => {
                    let reason = if e.is_panic() {
                        "invoker panicked".to_string()
                    } else {
                        format!("invoker task failed: {}", e)
                    };
                    error!("💥 Subsystem {}: {}", self.roster[index].id, reason);
                    (Err(reason), started.elapsed())
                }
            };
            builder.record(index, call, elapsed);
        }

        let result = builder.finish();
        self.publish(&result);
        Ok(result)
    }

    fn publish(&self, result: &CycleResult) {
        for task in &result.tasks {
            metrics::inc_task(&task.id, task.outcome.is_success());
            match task.outcome {
                TaskOutcome::Failure { ref reason } => {
                    warn!("⚠️  Subsystem {} failed: {}", task.id, reason);
                }
                _ => debug!("✅ Subsystem {} succeeded in {}ms", task.id, task.duration_ms),
            }
        }

        metrics::record_cycle_completed(result.duration_ms as f64 / 1000.0);
        metrics::set_last_cycle_metrics(&result.aggregate_metrics);

        self.sink.record_event(EventPayload::CycleCompleted {
            tasks: result.tasks.len(),
            success_count: result.success_count,
            failure_count: result.failure_count,
            duration_ms: result.duration_ms,
            metrics: result.aggregate_metrics.clone(),
        });

        *self
            .last_cycle
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(result.clone());
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);

        info!("✅ {}", result.summary());
    }

    /// The last completed cycle, if any
    pub fn last_cycle(&self) -> Option<CycleResult> {
        self.last_cycle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the orchestrator
    ///
    /// Never waits for an in-flight cycle.
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            timestamp: Utc::now(),
            active: self.flight.is_active(),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_rejected: self.cycles_rejected.load(Ordering::Relaxed),
            roster: self.roster.iter().map(|e| e.id.clone()).collect(),
            last_cycle: self.last_cycle(),
        }
    }
}

async fn invoke_bounded(
    invoker: &dyn SubsystemInvoker,
    endpoint: &SubsystemEndpoint,
    timeout: Duration,
) -> (Result<Value, String>, Duration) {
    let started = Instant::now();

    let call = match tokio::time::timeout(timeout, invoker.invoke(endpoint)).await {
        Ok(Ok(payload)) => Ok(payload),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {}ms", timeout.as_millis())),
    };

    (call, started.elapsed())
}

/// Holds the cycle-active gauge at 1 until dropped
struct CycleActive;

impl CycleActive {
    fn enter() -> Self {
        metrics::set_cycle_active(true);
        CycleActive
    }
}

impl Drop for CycleActive {
    fn drop(&mut self) {
        metrics::set_cycle_active(false);
    }
}

/// Cancels in-flight calls when a cycle future is dropped
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

#[async_trait]
impl Reactor for AutomationOrchestrator {
    fn action(&self) -> &str {
        "orchestrator_cycle"
    }

    async fn react(&self, trigger: TriggerContext) -> Result<(), SentinelError> {
        info!(
            "🚑 Crisis reaction: reading {} after {} checks at or below {}",
            trigger.reading.value, trigger.consecutive_below, trigger.threshold
        );

        match self.activate_all().await {
            Ok(result) => {
                if !result.is_clean() {
                    warn!(
                        "⚠️  Crisis cycle finished with {} failed subsystems",
                        result.failure_count
                    );
                }
                Ok(())
            }
            // A cycle is already remediating
            Err(SentinelError::AdmissionRejected) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubInvoker;
    use lifeline_observability::{Journal, NullSink};
    use serde_json::json;
    use std::time::Duration;

    fn endpoints(ids: &[&str]) -> Vec<SubsystemEndpoint> {
        ids.iter()
            .map(|id| SubsystemEndpoint::new(*id, format!("/api/{}", id)))
            .collect()
    }

    fn orchestrator(invoker: Arc<StubInvoker>, ids: &[&str]) -> AutomationOrchestrator {
        AutomationOrchestrator::new(
            endpoints(ids),
            invoker,
            OrchestratorPolicy::default(),
            Arc::new(NullSink),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_roster() {
        let invoker = Arc::new(StubInvoker::new());

        let empty = AutomationOrchestrator::new(
            Vec::new(),
            invoker.clone(),
            OrchestratorPolicy::default(),
            Arc::new(NullSink),
        );
        assert!(matches!(empty, Err(SentinelError::InvalidPolicy(_))));

        let dup = AutomationOrchestrator::new(
            endpoints(&["a", "a"]),
            invoker,
            OrchestratorPolicy::default(),
            Arc::new(NullSink),
        );
        assert!(matches!(dup, Err(SentinelError::InvalidPolicy(_))));
    }

    #[tokio::test]
    async fn test_all_fail_still_clears_active() {
        let invoker = Arc::new(
            StubInvoker::new()
                .fail("a", "connection refused")
                .fail("b", "HTTP status 502"),
        );
        let orch = orchestrator(invoker, &["a", "b"]);

        let result = orch.activate_all().await.unwrap();
        assert_eq!(result.success_count, 0);
        assert_eq!(result.failure_count, 2);
        assert!(!orch.is_active());

        // The next cycle is admitted
        assert!(orch.activate_all().await.is_ok());
        assert_eq!(orch.status().cycles_completed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_failure() {
        let invoker = Arc::new(
            StubInvoker::new()
                .respond("fast", json!({ "success": true, "total_estimated_revenue": 5 }))
                .hang("slow"),
        );
        let orch = orchestrator(invoker, &["slow", "fast"]);

        let result = orch.activate_all().await.unwrap();

        assert_eq!(result.tasks[0].id, "slow");
        match result.tasks[0].outcome {
            TaskOutcome::Failure { ref reason } => assert!(reason.contains("timed out")),
            ref other => panic!("expected timeout failure, got {:?}", other),
        }
        assert_eq!(result.metric("total_revenue"), 5.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_does_not_block_on_cycle() {
        let invoker = Arc::new(StubInvoker::new().delay(
            "a",
            Duration::from_secs(2),
            json!({ "success": true }),
        ));
        let orch = Arc::new(orchestrator(invoker, &["a"]));

        let running = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.activate_all().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let status = orch.status();
        assert!(status.active);
        assert!(status.last_cycle.is_none());

        running.await.unwrap().unwrap();
        let status = orch.status();
        assert!(!status.active);
        assert_eq!(status.roster, vec!["a".to_string()]);
        assert!(status.last_cycle.is_some());
        assert!(status.summary().contains("last: 1/1 ok"));
    }

    #[tokio::test]
    async fn test_cycle_is_journaled() {
        let journal = Arc::new(Journal::in_memory(16));
        let invoker = Arc::new(StubInvoker::new().respond("a", json!({ "success": true })));
        let orch = AutomationOrchestrator::new(
            endpoints(&["a"]),
            invoker,
            OrchestratorPolicy::default(),
            journal.clone(),
        )
        .unwrap();

        orch.activate_all().await.unwrap();

        let events = journal.recent(10);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload.kind(), "cycle_completed");
    }
}
