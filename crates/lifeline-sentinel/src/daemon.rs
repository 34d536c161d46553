//! Crisis Monitor: The OODA Loop
//!
//! Samples the monitored signal on the scheduler's sampling trigger and
//! dispatches the reactor once per sustained depression.
//!
//! ```text
//!            start()                 run reaches min_consecutive_below
//!   Idle ─────────────> Monitoring ─────────────────────────────────> Triggered
//!    ^                     │   ^                                          │
//!    └──── stop() ─────────┘   └────────── reaction settles ──────────────┘
//! ```

use crate::error::SentinelError;
use crate::policy::MonitorPolicy;
use crate::reactor::{Reactor, TriggerContext};
use crate::sampler::{Reading, Sampler};
use crate::scheduler::{Scheduler, TriggerKind, TriggerStart};
use lifeline_core_resilience::FirstTick;
use lifeline_observability::{metrics, EventPayload, EventSink};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Monitor lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    Idle,
    Monitoring,
    /// A reaction is in flight
    Triggered,
}

/// Hysteresis state, owned by the monitor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrisisState {
    pub status: MonitorStatus,

    /// Length of the current depressed run
    ///
    /// Reset by any healthy reading and right after a trigger.
    pub consecutive_below_threshold: u32,

    pub threshold: f64,
    pub last_reading: Option<Reading>,
}

/// What one sample did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Sampler failed; state untouched
    Skipped,
    /// Reading above threshold; run reset
    Healthy,
    /// Reading at or below threshold, run not long enough yet
    Depressed { consecutive: u32 },
    /// Run completed and the reactor was dispatched
    Triggered,
    /// Run completed while a reaction was still in flight
    Suppressed,
}

/// Point-in-time monitor statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorStats {
    pub status: MonitorStatus,
    pub last_reading: Option<Reading>,
    pub consecutive_below_threshold: u32,
    pub threshold: f64,
    pub min_consecutive_below: u32,
    pub sample_interval_secs: u64,
    pub samples_taken: u64,
    pub samples_skipped: u64,
    pub triggers_fired: u64,
    pub triggers_suppressed: u64,
    pub reaction_in_flight: bool,
}

#[derive(Debug, Default)]
struct MonitorCounters {
    samples_taken: AtomicU64,
    samples_skipped: AtomicU64,
    triggers_fired: AtomicU64,
    triggers_suppressed: AtomicU64,
}

impl MonitorCounters {
    fn reset(&self) {
        self.samples_taken.store(0, Ordering::Relaxed);
        self.samples_skipped.store(0, Ordering::Relaxed);
        self.triggers_fired.store(0, Ordering::Relaxed);
        self.triggers_suppressed.store(0, Ordering::Relaxed);
    }
}

enum Decision {
    Healthy,
    Depressed(u32),
    Fire(u32),
    Suppress(u32),
}

/// The Crisis Monitor
///
/// Runs an OODA loop on every sampling tick:
/// - **Observe:** Take one reading from the sampler
/// - **Orient:** Compare it with the threshold
/// - **Decide:** Extend or reset the depressed run
/// - **Act:** Dispatch the reactor when the run is long enough
pub struct CrisisMonitor {
    sampler: Arc<dyn Sampler>,
    reactor: Arc<dyn Reactor>,
    scheduler: Arc<Scheduler>,
    sink: Arc<dyn EventSink>,
    policy: MonitorPolicy,

    /// Never held across an await
    state: Arc<Mutex<CrisisState>>,

    reaction_in_flight: Arc<AtomicBool>,
    counters: MonitorCounters,
}

impl CrisisMonitor {
    /// Create an idle monitor
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::InvalidPolicy`] if the policy does not validate.
    pub fn new(
        sampler: Arc<dyn Sampler>,
        reactor: Arc<dyn Reactor>,
        scheduler: Arc<Scheduler>,
        sink: Arc<dyn EventSink>,
        policy: MonitorPolicy,
    ) -> Result<Self, SentinelError> {
        policy.validate()?;

        let state = CrisisState {
            status: MonitorStatus::Idle,
            consecutive_below_threshold: 0,
            threshold: policy.threshold,
            last_reading: None,
        };

        Ok(Self {
            sampler,
            reactor,
            scheduler,
            sink,
            policy,
            state: Arc::new(Mutex::new(state)),
            reaction_in_flight: Arc::new(AtomicBool::new(false)),
            counters: MonitorCounters::default(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, CrisisState> {
        lock_state(&self.state)
    }

    pub fn policy(&self) -> &MonitorPolicy {
        &self.policy
    }

    /// Idle → Monitoring
    ///
    /// Registers the sampling trigger with the scheduler. The first sample is
    /// taken immediately. Returns [`TriggerStart::AlreadyRunning`] without
    /// side effects when the monitor is not idle.
    pub fn start(self: &Arc<Self>) -> TriggerStart {
        {
            let mut state = self.lock();
            if state.status != MonitorStatus::Idle {
                return TriggerStart::AlreadyRunning;
            }
            state.status = MonitorStatus::Monitoring;
        }

        let monitor = Arc::downgrade(self);
        let registered = self.scheduler.start_trigger(
            TriggerKind::Sampling,
            self.policy.sample_interval(),
            FirstTick::Immediate,
            move || {
                let monitor = monitor.clone();
                async move {
                    if let Some(monitor) = monitor.upgrade() {
                        monitor.sample().await;
                    }
                }
            },
        );
        if registered == TriggerStart::AlreadyRunning {
            warn!("⚠️  Monitor: sampling trigger was already registered");
        }

        self.sink.record_event(EventPayload::MonitorStarted {
            threshold: self.policy.threshold,
            min_consecutive_below: self.policy.min_consecutive_below,
            interval_secs: self.policy.sample_interval_s,
        });
        info!(
            "🛡️  Crisis Monitor Active | Threshold: {} | Min Consecutive: {} | Interval: {}s",
            self.policy.threshold, self.policy.min_consecutive_below, self.policy.sample_interval_s
        );

        TriggerStart::Started
    }

    /// Any state → Idle
    ///
    /// Returns once the sampling timer has ended, so no sample is taken after
    /// this resolves. Returns false if the monitor was already idle.
    pub async fn stop(&self) -> bool {
        {
            let mut state = self.lock();
            if state.status == MonitorStatus::Idle {
                return false;
            }
            state.status = MonitorStatus::Idle;
        }

        self.scheduler.stop_trigger(TriggerKind::Sampling).await;
        self.sink.record_event(EventPayload::MonitorStopped);
        info!("⏹️  Crisis Monitor stopped");
        true
    }

    /// Stop, then clear the run, the last reading and every counter
    pub async fn reset(&self) {
        self.stop().await;

        {
            let mut state = self.lock();
            state.consecutive_below_threshold = 0;
            state.last_reading = None;
        }
        self.counters.reset();

        self.sink.record_event(EventPayload::MonitorReset);
        info!("🔄 Crisis Monitor reset");
    }

    /// Take one sample and apply the hysteresis rule
    ///
    /// Works on an idle monitor too; its status is then left unchanged.
    pub async fn sample(&self) -> TickOutcome {
        // Observe
        let reading = match self.sampler.sample().await {
            Ok(reading) => reading,
            Err(e) => {
                self.counters.samples_skipped.fetch_add(1, Ordering::Relaxed);
                metrics::inc_sample("skipped");
                warn!("⚠️  Monitor: sample failed, tick skipped: {}", e);
                self.sink.record_event(EventPayload::SampleSkipped {
                    reason: e.to_string(),
                });
                return TickOutcome::Skipped;
            }
        };
        self.counters.samples_taken.fetch_add(1, Ordering::Relaxed);

        // Orient + Decide
        match self.evaluate(reading) {
            Decision::Healthy => {
                metrics::inc_sample("healthy");
                debug!("💚 Monitor: {} above threshold", reading.value);
                TickOutcome::Healthy
            }
            Decision::Depressed(consecutive) => {
                metrics::inc_sample("depressed");
                info!(
                    "📉 Monitor: {} at or below threshold ({}/{})",
                    reading.value, consecutive, self.policy.min_consecutive_below
                );
                TickOutcome::Depressed { consecutive }
            }
            Decision::Suppress(consecutive) => {
                metrics::inc_sample("depressed");
                metrics::inc_trigger("suppressed");
                self.counters
                    .triggers_suppressed
                    .fetch_add(1, Ordering::Relaxed);
                warn!("⏸️  Monitor: crisis persists but a reaction is still in flight");
                self.sink.record_event(EventPayload::TriggerSuppressed {
                    value: reading.value,
                    consecutive_checks: consecutive,
                });
                TickOutcome::Suppressed
            }
            // Act
            Decision::Fire(consecutive) => {
                metrics::inc_sample("depressed");
                metrics::inc_trigger("fired");
                self.counters.triggers_fired.fetch_add(1, Ordering::Relaxed);
                error!(
                    "🚨 CRISIS: {} at or below {} for {} consecutive checks, dispatching {}",
                    reading.value,
                    self.policy.threshold,
                    consecutive,
                    self.reactor.action()
                );
                self.sink.record_event(EventPayload::TriggerFired {
                    value: reading.value,
                    consecutive_checks: consecutive,
                    action: self.reactor.action().to_string(),
                });

                self.dispatch(TriggerContext {
                    reading,
                    consecutive_below: consecutive,
                    threshold: self.policy.threshold,
                });
                TickOutcome::Triggered
            }
        }
    }

    fn evaluate(&self, reading: Reading) -> Decision {
        let mut state = self.lock();
        state.last_reading = Some(reading);

        if reading.value > state.threshold {
            state.consecutive_below_threshold = 0;
            return Decision::Healthy;
        }

        state.consecutive_below_threshold = state.consecutive_below_threshold.saturating_add(1);
        let consecutive = state.consecutive_below_threshold;
        if consecutive < self.policy.min_consecutive_below {
            return Decision::Depressed(consecutive);
        }

        // The run is consumed whether or not the reactor runs
        state.consecutive_below_threshold = 0;

        if self
            .reaction_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Decision::Suppress(consecutive);
        }

        if state.status == MonitorStatus::Monitoring {
            state.status = MonitorStatus::Triggered;
        }
        Decision::Fire(consecutive)
    }

    fn dispatch(&self, context: TriggerContext) {
        let release = ReactionRelease {
            in_flight: self.reaction_in_flight.clone(),
            state: self.state.clone(),
        };
        let reactor = self.reactor.clone();
        let sink = self.sink.clone();

        tokio::spawn(async move {
            // Dropped last, after the completion event, even on panic
            let _release = release;
            let started = Instant::now();

            let result = reactor.react(context).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    info!("✅ Crisis reaction settled in {}ms", duration_ms);
                    sink.record_event(EventPayload::ReactionCompleted {
                        success: true,
                        duration_ms,
                        error: None,
                    });
                }
                Err(e) => {
                    error!("❌ Crisis reaction failed after {}ms: {}", duration_ms, e);
                    sink.record_event(EventPayload::ReactionCompleted {
                        success: false,
                        duration_ms,
                        error: Some(e.to_string()),
                    });
                }
            }
        });
    }

    /// Snapshot of the hysteresis state
    pub fn state(&self) -> CrisisState {
        self.lock().clone()
    }

    pub fn status(&self) -> MonitorStatus {
        self.lock().status
    }

    pub fn reaction_in_flight(&self) -> bool {
        self.reaction_in_flight.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> MonitorStats {
        let state = self.state();
        MonitorStats {
            status: state.status,
            last_reading: state.last_reading,
            consecutive_below_threshold: state.consecutive_below_threshold,
            threshold: state.threshold,
            min_consecutive_below: self.policy.min_consecutive_below,
            sample_interval_secs: self.policy.sample_interval_s,
            samples_taken: self.counters.samples_taken.load(Ordering::Relaxed),
            samples_skipped: self.counters.samples_skipped.load(Ordering::Relaxed),
            triggers_fired: self.counters.triggers_fired.load(Ordering::Relaxed),
            triggers_suppressed: self.counters.triggers_suppressed.load(Ordering::Relaxed),
            reaction_in_flight: self.reaction_in_flight(),
        }
    }
}

fn lock_state(state: &Mutex<CrisisState>) -> MutexGuard<'_, CrisisState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight flag and leaves Triggered when a reaction ends
struct ReactionRelease {
    in_flight: Arc<AtomicBool>,
    state: Arc<Mutex<CrisisState>>,
}

impl Drop for ReactionRelease {
    fn drop(&mut self) {
        {
            let mut state = lock_state(&self.state);
            if state.status == MonitorStatus::Triggered {
                state.status = MonitorStatus::Monitoring;
            }
        }
        self.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medic::SubsystemEndpoint;
    use crate::orchestrator::AutomationOrchestrator;
    use crate::policy::OrchestratorPolicy;
    use crate::testing::{CountingReactor, ScriptedSampler, StubInvoker};
    use lifeline_observability::{Journal, NullSink};
    use std::time::Duration;

    fn scheduler() -> Arc<Scheduler> {
        let orchestrator = AutomationOrchestrator::new(
            vec![SubsystemEndpoint::new("noop", "/noop")],
            Arc::new(StubInvoker::new()),
            OrchestratorPolicy::default(),
            Arc::new(NullSink),
        )
        .unwrap();
        Arc::new(Scheduler::new(Arc::new(orchestrator)))
    }

    fn monitor(
        sampler: Arc<ScriptedSampler>,
        reactor: Arc<CountingReactor>,
        sink: Arc<dyn EventSink>,
    ) -> Arc<CrisisMonitor> {
        Arc::new(
            CrisisMonitor::new(
                sampler,
                reactor,
                scheduler(),
                sink,
                MonitorPolicy::with_threshold(10.0),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let policy = MonitorPolicy {
            min_consecutive_below: 1,
            ..Default::default()
        };
        let result = CrisisMonitor::new(
            Arc::new(ScriptedSampler::new([])),
            Arc::new(CountingReactor::new()),
            scheduler(),
            Arc::new(NullSink),
            policy,
        );
        assert!(matches!(result, Err(SentinelError::InvalidPolicy(_))));
    }

    #[tokio::test]
    async fn test_healthy_reading_resets_run() {
        let sampler = Arc::new(ScriptedSampler::new([5.0, 20.0, 5.0]));
        let reactor = Arc::new(CountingReactor::new());
        let monitor = monitor(sampler, reactor.clone(), Arc::new(NullSink));

        assert_eq!(
            monitor.sample().await,
            TickOutcome::Depressed { consecutive: 1 }
        );
        assert_eq!(monitor.sample().await, TickOutcome::Healthy);
        assert_eq!(
            monitor.sample().await,
            TickOutcome::Depressed { consecutive: 1 }
        );
        assert_eq!(reactor.invocations(), 0);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let sampler = Arc::new(ScriptedSampler::new([10.0, 10.0]));
        let reactor = Arc::new(CountingReactor::new());
        let monitor = monitor(sampler, reactor, Arc::new(NullSink));

        monitor.sample().await;
        assert_eq!(monitor.sample().await, TickOutcome::Triggered);
    }

    #[tokio::test]
    async fn test_sampler_failure_skips_tick() {
        let sampler = Arc::new(ScriptedSampler::from_results([
            Ok(5.0),
            Err("connection refused".to_string()),
            Ok(5.0),
        ]));
        let reactor = Arc::new(CountingReactor::new());
        let journal = Arc::new(Journal::in_memory(16));
        let monitor = monitor(sampler, reactor, journal.clone());

        monitor.sample().await;
        assert_eq!(monitor.sample().await, TickOutcome::Skipped);
        assert_eq!(monitor.state().consecutive_below_threshold, 1);

        // The failed tick neither broke nor extended the run
        assert_eq!(monitor.sample().await, TickOutcome::Triggered);

        let stats = monitor.stats();
        assert_eq!(stats.samples_taken, 2);
        assert_eq!(stats.samples_skipped, 1);
        assert!(journal
            .recent(16)
            .iter()
            .any(|e| e.payload.kind() == "sample_skipped"));
    }

    #[tokio::test]
    async fn test_manual_sample_on_idle_keeps_status() {
        let sampler = Arc::new(ScriptedSampler::new([0.0, 0.0]));
        let reactor = Arc::new(CountingReactor::new());
        let monitor = monitor(sampler, reactor.clone(), Arc::new(NullSink));

        monitor.sample().await;
        assert_eq!(monitor.sample().await, TickOutcome::Triggered);
        assert_eq!(monitor.status(), MonitorStatus::Idle);

        reactor.wait_for(1).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent_and_stop_returns_to_idle() {
        let sampler = Arc::new(ScriptedSampler::new([]).with_fallback(50.0));
        let reactor = Arc::new(CountingReactor::new());
        let monitor = monitor(sampler.clone(), reactor, Arc::new(NullSink));

        assert_eq!(monitor.start(), TriggerStart::Started);
        assert_eq!(monitor.start(), TriggerStart::AlreadyRunning);
        assert_eq!(monitor.status(), MonitorStatus::Monitoring);

        // Immediate first sample, then one every 300s
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(sampler.calls(), 2);

        assert!(monitor.stop().await);
        assert!(!monitor.stop().await);
        assert_eq!(monitor.status(), MonitorStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_counters() {
        let sampler = Arc::new(ScriptedSampler::new([3.0]).with_fallback(50.0));
        let reactor = Arc::new(CountingReactor::new());
        let journal = Arc::new(Journal::in_memory(16));
        let monitor = monitor(sampler, reactor, journal.clone());

        monitor.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(monitor.stats().samples_taken, 1);

        monitor.reset().await;

        let stats = monitor.stats();
        assert_eq!(stats.status, MonitorStatus::Idle);
        assert_eq!(stats.samples_taken, 0);
        assert_eq!(stats.consecutive_below_threshold, 0);
        assert!(stats.last_reading.is_none());

        let kinds: Vec<&str> = journal.recent(16).iter().map(|e| e.payload.kind()).collect();
        assert_eq!(
            kinds,
            vec!["monitor_started", "monitor_stopped", "monitor_reset"]
        );
    }
}
