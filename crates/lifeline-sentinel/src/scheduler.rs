//! Scheduler: the only owner of periodic timers
//!
//! Three named triggers exist, each either stopped or running:
//!
//! - **Cycle**: runs [`AutomationOrchestrator::activate_all`] every period
//! - **StatusPoll**: reports [`AutomationOrchestrator::status`] every period
//! - **Sampling**: drives the crisis monitor, registered by the monitor itself
//!
//! Starting a running trigger is coalesced into [`TriggerStart::AlreadyRunning`].
//! Stopping returns only after the timer task has ended.

use crate::orchestrator::AutomationOrchestrator;
use lifeline_core_resilience::{FirstTick, PeriodicTrigger};
use lifeline_observability::metrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info};

/// Which trigger a schedule entry drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Cycle,
    StatusPoll,
    Sampling,
}

impl TriggerKind {
    pub fn name(&self) -> &'static str {
        match self {
            TriggerKind::Cycle => "cycle",
            TriggerKind::StatusPoll => "status_poll",
            TriggerKind::Sampling => "sampling",
        }
    }
}

/// Result of asking for a trigger to start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStart {
    Started,
    AlreadyRunning,
}

/// An active trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub kind: TriggerKind,
    pub period_ms: u64,
    pub ticks: u64,
}

/// Owns every periodic timer
pub struct Scheduler {
    orchestrator: Arc<AutomationOrchestrator>,
    triggers: Mutex<HashMap<TriggerKind, PeriodicTrigger>>,
    status_polls: Arc<AtomicU64>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<AutomationOrchestrator>) -> Self {
        Self {
            orchestrator,
            triggers: Mutex::new(HashMap::new()),
            status_polls: Arc::new(AtomicU64::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TriggerKind, PeriodicTrigger>> {
        self.triggers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn orchestrator(&self) -> &Arc<AutomationOrchestrator> {
        &self.orchestrator
    }

    /// Run a remediation cycle every `period`, first after one period
    ///
    /// A failing or panicking cycle is logged and never stops the timer.
    pub fn start_cycle_trigger(&self, period: Duration) -> TriggerStart {
        let orchestrator = self.orchestrator.clone();
        self.start_trigger(TriggerKind::Cycle, period, FirstTick::AfterPeriod, move || {
            let orchestrator = orchestrator.clone();
            async move { run_cycle(&orchestrator).await }
        })
    }

    /// Report orchestrator status every `period`, first after one period
    pub fn start_status_poll_trigger(&self, period: Duration) -> TriggerStart {
        let orchestrator = self.orchestrator.clone();
        let polls = self.status_polls.clone();
        self.start_trigger(
            TriggerKind::StatusPoll,
            period,
            FirstTick::AfterPeriod,
            move || {
                let orchestrator = orchestrator.clone();
                let polls = polls.clone();
                async move { emit_status(&orchestrator, &polls) }
            },
        )
    }

    /// Start `kind` with an arbitrary job unless it is already running
    pub fn start_trigger<F, Fut>(
        &self,
        kind: TriggerKind,
        period: Duration,
        first_tick: FirstTick,
        job: F,
    ) -> TriggerStart
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut triggers = self.lock();

        if triggers.get(&kind).is_some_and(PeriodicTrigger::is_running) {
            debug!("⏱️  Trigger '{}' already running", kind.name());
            return TriggerStart::AlreadyRunning;
        }

        triggers.insert(kind, PeriodicTrigger::spawn(kind.name(), period, first_tick, job));
        info!("⏱️  Trigger '{}' started every {:?}", kind.name(), period);
        TriggerStart::Started
    }

    /// Stop one trigger and wait for its task to end
    ///
    /// Returns false if it was not running.
    pub async fn stop_trigger(&self, kind: TriggerKind) -> bool {
        let trigger = self.lock().remove(&kind);
        match trigger {
            Some(trigger) => {
                trigger.stop().await;
                info!("⏹️  Trigger '{}' stopped", kind.name());
                true
            }
            None => false,
        }
    }

    /// Stop every trigger. Safe to call when nothing runs.
    pub async fn stop_all(&self) {
        let triggers: Vec<(TriggerKind, PeriodicTrigger)> = self.lock().drain().collect();
        for (kind, trigger) in triggers {
            trigger.stop().await;
            info!("⏹️  Trigger '{}' stopped", kind.name());
        }
    }

    pub fn is_running(&self, kind: TriggerKind) -> bool {
        self.lock()
            .get(&kind)
            .is_some_and(PeriodicTrigger::is_running)
    }

    /// Active triggers, ordered by kind
    pub fn entries(&self) -> Vec<ScheduleEntry> {
        let mut entries: Vec<ScheduleEntry> = self
            .lock()
            .iter()
            .map(|(kind, trigger)| ScheduleEntry {
                kind: *kind,
                period_ms: trigger.period().as_millis() as u64,
                ticks: trigger.ticks(),
            })
            .collect();
        entries.sort_by_key(|e| e.kind);
        entries
    }

    /// Number of status reports emitted so far
    pub fn status_polls(&self) -> u64 {
        self.status_polls.load(Ordering::Relaxed)
    }
}

async fn run_cycle(orchestrator: &AutomationOrchestrator) {
    match orchestrator.activate_all().await {
        Ok(result) => debug!("🔄 Scheduled {}", result.summary()),
        Err(e) if e.is_benign() => info!("⏭️  Scheduled cycle skipped: {}", e),
        Err(e) => error!("❌ Scheduled cycle failed: {}", e),
    }
}

fn emit_status(orchestrator: &AutomationOrchestrator, polls: &AtomicU64) {
    let status = orchestrator.status();
    polls.fetch_add(1, Ordering::Relaxed);

    metrics::inc_status_poll();
    metrics::set_cycle_active(status.active);
    if let Some(ref cycle) = status.last_cycle {
        metrics::set_last_cycle_metrics(&cycle.aggregate_metrics);
    }

    info!("📊 {}", status.summary());
}
