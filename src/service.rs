/*!
 * The Lifeline service
 *
 * One explicit object built at startup. It owns the journal and hands `Arc`
 * handles of the orchestrator, the scheduler and the monitor to each other.
 */

use crate::config::LifelineConfig;
use crate::error::{LifelineError, Result};
use lifeline_observability::Journal;
use lifeline_sentinel::{
    AutomationOrchestrator, CrisisMonitor, CycleResult, HttpInvoker, HttpSampler, MonitorStats,
    OrchestratorStatus, Reading, Sampler, ScheduleEntry, Scheduler, SentinelError,
    SubsystemInvoker, TriggerKind, TriggerStart,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// What `start_scheduler` set up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerSummary {
    pub cycle: TriggerStart,
    pub cycle_interval_secs: u64,
    pub status_poll: TriggerStart,
    pub status_poll_interval_secs: u64,
    pub monitoring: bool,
    pub subsystems: usize,
}

impl SchedulerSummary {
    pub fn summary(&self) -> String {
        format!(
            "Continuous automation: {} subsystems | cycle every {}s | status every {}s | crisis monitor {}",
            self.subsystems,
            self.cycle_interval_secs,
            self.status_poll_interval_secs,
            if self.monitoring { "on" } else { "off" }
        )
    }
}

/// Combined view of every component
#[derive(Debug, Clone, Serialize)]
pub struct LifelineStatus {
    pub orchestrator: OrchestratorStatus,
    pub monitor: Option<MonitorStats>,
    pub schedule: Vec<ScheduleEntry>,
    pub journal_events: usize,
}

/// Monitor, orchestrator and scheduler wired together
pub struct Lifeline {
    config: LifelineConfig,
    journal: Arc<Journal>,
    orchestrator: Arc<AutomationOrchestrator>,
    scheduler: Arc<Scheduler>,
    sampler: Option<Arc<dyn Sampler>>,
    monitor: Option<Arc<CrisisMonitor>>,
}

impl Lifeline {
    /// Build the service with HTTP collaborators
    ///
    /// # Errors
    ///
    /// Configuration faults: invalid settings, an unset token variable or an
    /// unopenable journal file.
    pub fn from_config(config: LifelineConfig) -> Result<Self> {
        config.validate()?;

        let journal = match config.journal.path {
            Some(ref path) => Journal::with_file(config.journal.capacity, path)?,
            None => Journal::in_memory(config.journal.capacity),
        };

        let mut invoker = HttpInvoker::new(config.orchestrator.base_url.clone())
            .map_err(|e| LifelineError::Config(format!("HTTP client: {}", e)))?;
        if let Some(token) = config.resolve_auth_token()? {
            invoker = invoker.with_auth_token(token);
        }

        let sampler = match config.monitor.probe_url {
            Some(ref url) => {
                let sampler = HttpSampler::new(
                    url.clone(),
                    config.monitor.probe_value_pointer.clone(),
                    Duration::from_millis(config.monitor.probe_timeout_ms),
                )
                .map_err(|e| LifelineError::Config(format!("HTTP client: {}", e)))?;
                Some(Arc::new(sampler) as Arc<dyn Sampler>)
            }
            None => None,
        };

        Self::with_parts(config, Arc::new(journal), Arc::new(invoker), sampler)
    }

    /// Build the service around caller-supplied collaborators
    ///
    /// Without a sampler the crisis monitor is not created.
    pub fn with_parts(
        config: LifelineConfig,
        journal: Arc<Journal>,
        invoker: Arc<dyn SubsystemInvoker>,
        sampler: Option<Arc<dyn Sampler>>,
    ) -> Result<Self> {
        config.validate()?;

        let orchestrator = Arc::new(AutomationOrchestrator::new(
            config.orchestrator.subsystems.clone(),
            invoker,
            config.orchestrator_policy(),
            journal.clone(),
        )?);
        let scheduler = Arc::new(Scheduler::new(orchestrator.clone()));

        let monitor = match sampler {
            Some(ref sampler) => Some(Arc::new(CrisisMonitor::new(
                sampler.clone(),
                orchestrator.clone(),
                scheduler.clone(),
                journal.clone(),
                config.monitor_policy(),
            )?)),
            None => None,
        };

        Ok(Self {
            config,
            journal,
            orchestrator,
            scheduler,
            sampler,
            monitor,
        })
    }

    pub fn config(&self) -> &LifelineConfig {
        &self.config
    }

    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    pub fn orchestrator(&self) -> &Arc<AutomationOrchestrator> {
        &self.orchestrator
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn monitor(&self) -> Option<&Arc<CrisisMonitor>> {
        self.monitor.as_ref()
    }

    /// Run one remediation cycle now
    pub async fn activate_all(&self) -> Result<CycleResult> {
        Ok(self.orchestrator.activate_all().await?)
    }

    /// Snapshot of every component; never waits for a cycle
    pub fn status(&self) -> LifelineStatus {
        LifelineStatus {
            orchestrator: self.orchestrator.status(),
            monitor: self.monitor.as_ref().map(|m| m.stats()),
            schedule: self.scheduler.entries(),
            journal_events: self.journal.len(),
        }
    }

    /// Take one reading without touching the monitor state
    pub async fn probe(&self) -> Result<Reading> {
        let sampler = self.sampler.as_ref().ok_or_else(not_configured)?;
        sampler
            .sample()
            .await
            .map_err(|e| LifelineError::Partial(format!("probe failed: {}", e)))
    }

    /// Start the crisis monitor
    ///
    /// # Errors
    ///
    /// `NotConfigured` when no probe URL is set.
    pub fn start_monitoring(&self) -> Result<TriggerStart> {
        let monitor = self.monitor.as_ref().ok_or_else(not_configured)?;
        Ok(monitor.start())
    }

    /// Stop the crisis monitor; false if it was not running
    pub async fn stop_monitoring(&self) -> bool {
        match self.monitor {
            Some(ref monitor) => monitor.stop().await,
            None => false,
        }
    }

    /// Start the cycle and status-poll triggers
    pub fn start_scheduler(&self, cycle_period: Duration, poll_period: Duration) -> SchedulerSummary {
        let cycle = self.scheduler.start_cycle_trigger(cycle_period);
        let status_poll = self.scheduler.start_status_poll_trigger(poll_period);

        let summary = SchedulerSummary {
            cycle,
            cycle_interval_secs: cycle_period.as_secs(),
            status_poll,
            status_poll_interval_secs: poll_period.as_secs(),
            monitoring: self.scheduler.is_running(TriggerKind::Sampling),
            subsystems: self.orchestrator.roster().len(),
        };
        info!("🛰️  {}", summary.summary());
        summary
    }

    /// Start the scheduler with the configured periods
    pub fn start_configured_scheduler(&self) -> SchedulerSummary {
        self.start_scheduler(
            self.config.scheduler.cycle_interval(),
            self.config.scheduler.status_poll_interval(),
        )
    }

    /// Stop the cycle and status-poll triggers
    ///
    /// The monitor's sampling trigger is left alone.
    pub async fn stop_scheduler(&self) {
        self.scheduler.stop_trigger(TriggerKind::Cycle).await;
        self.scheduler.stop_trigger(TriggerKind::StatusPoll).await;
    }

    /// Stop everything and flush the journal
    pub async fn shutdown(&self) {
        self.stop_monitoring().await;
        self.scheduler.stop_all().await;

        if let Err(e) = self.journal.flush() {
            warn!("📝 Journal flush failed on shutdown: {}", e);
        }
        info!("👋 Lifeline stopped");
    }
}

fn not_configured() -> LifelineError {
    SentinelError::NotConfigured("monitor.probe_url".to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifeline_sentinel::testing::{ScriptedSampler, StubInvoker};
    use lifeline_sentinel::SubsystemEndpoint;
    use serde_json::json;

    fn config() -> LifelineConfig {
        let mut config = LifelineConfig::default();
        config.orchestrator.subsystems = vec![
            SubsystemEndpoint::new("payments", "/payments"),
            SubsystemEndpoint::new("content", "/content"),
        ];
        config
    }

    fn invoker() -> Arc<StubInvoker> {
        Arc::new(
            StubInvoker::new()
                .respond("payments", json!({ "success": true, "total_estimated_revenue": 30 }))
                .respond("content", json!({ "success": true })),
        )
    }

    #[tokio::test]
    async fn test_monitoring_requires_probe() {
        let service = Lifeline::with_parts(
            config(),
            Arc::new(Journal::in_memory(10)),
            invoker(),
            None,
        )
        .unwrap();

        let err = service.start_monitoring().unwrap_err();
        assert!(err.is_fatal());
        assert!(service.probe().await.is_err());
        assert!(!service.stop_monitoring().await);
    }

    #[tokio::test]
    async fn test_probe_does_not_touch_monitor() {
        let sampler = Arc::new(ScriptedSampler::new([0.0]));
        let service = Lifeline::with_parts(
            config(),
            Arc::new(Journal::in_memory(10)),
            invoker(),
            Some(sampler),
        )
        .unwrap();

        assert_eq!(service.probe().await.unwrap().value, 0.0);
        let stats = service.status().monitor.unwrap();
        assert_eq!(stats.samples_taken, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_summary_and_shutdown() {
        let service = Lifeline::with_parts(
            config(),
            Arc::new(Journal::in_memory(10)),
            invoker(),
            None,
        )
        .unwrap();

        let summary = service.start_scheduler(Duration::from_secs(3600), Duration::from_secs(600));
        assert_eq!(summary.cycle, TriggerStart::Started);
        assert_eq!(summary.status_poll, TriggerStart::Started);
        assert!(!summary.monitoring);
        assert_eq!(summary.subsystems, 2);
        assert!(summary.summary().contains("cycle every 3600s"));

        let again = service.start_configured_scheduler();
        assert_eq!(again.cycle, TriggerStart::AlreadyRunning);

        service.shutdown().await;
        assert!(service.status().schedule.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config();
        config.monitor.min_consecutive_below = 1;

        let result = Lifeline::with_parts(config, Arc::new(Journal::in_memory(10)), invoker(), None);
        assert!(matches!(result, Err(LifelineError::Config(_))));
    }
}
