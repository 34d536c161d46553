//! Lifeline Sentinel: Crisis Detection and Automated Remediation
//!
//! The Sentinel watches one business signal and, when it stays depressed,
//! fans a remediation cycle out to every collaborator subsystem at once.
//!
//! # Architecture: The OODA Loop
//!
//! ```text
//! ┌─────────────┐
//! │  Observe    │──> Sampler takes one reading per sampling tick
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Orient     │──> Compare with the threshold
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Decide     │──> Healthy? Depressed? Run long enough?
//! └──────┬──────┘
//!        │
//!        v
//! ┌─────────────┐
//! │  Act        │──> Reactor: AutomationOrchestrator::activate_all
//! └──────┬──────┘
//!        │
//!        └────> Loop
//! ```
//!
//! Timers are owned by the [`Scheduler`]: the monitor's sampling trigger, the
//! periodic cycle trigger and the status poll.
//!
//! # Example
//!
//! ```no_run
//! use lifeline_observability::Journal;
//! use lifeline_sentinel::{
//!     AutomationOrchestrator, CrisisMonitor, HttpInvoker, HttpSampler, MonitorPolicy,
//!     OrchestratorPolicy, Scheduler, SubsystemEndpoint,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let journal = Arc::new(Journal::in_memory(1000));
//!
//! let orchestrator = Arc::new(AutomationOrchestrator::new(
//!     vec![SubsystemEndpoint::new("payments", "/api/payments/run")],
//!     Arc::new(HttpInvoker::new("http://localhost:5000")?),
//!     OrchestratorPolicy::default(),
//!     journal.clone(),
//! )?);
//! let scheduler = Arc::new(Scheduler::new(orchestrator.clone()));
//!
//! let sampler = HttpSampler::new(
//!     "http://localhost:5000/api/revenue/current",
//!     "/total",
//!     Duration::from_secs(5),
//! )?;
//! let monitor = Arc::new(CrisisMonitor::new(
//!     Arc::new(sampler),
//!     orchestrator,
//!     scheduler.clone(),
//!     journal,
//!     MonitorPolicy::default(),
//! )?);
//!
//! monitor.start();
//! scheduler.start_cycle_trigger(Duration::from_secs(3600));
//! # Ok(())
//! # }
//! ```

pub mod daemon;
pub mod error;
pub mod medic;
pub mod metrics;
pub mod orchestrator;
pub mod policy;
pub mod reactor;
pub mod sampler;
pub mod scheduler;
pub mod testing;

pub use daemon::{CrisisMonitor, CrisisState, MonitorStats, MonitorStatus, TickOutcome};
pub use error::{InvokeError, SampleError, SentinelError};
pub use medic::{HttpInvoker, SubsystemEndpoint, SubsystemInvoker};
pub use metrics::{CycleResult, Task, TaskOutcome};
pub use orchestrator::{AutomationOrchestrator, OrchestratorStatus};
pub use policy::{MonitorPolicy, OrchestratorPolicy};
pub use reactor::{Reactor, TriggerContext};
pub use sampler::{HttpSampler, Reading, Sampler};
pub use scheduler::{ScheduleEntry, Scheduler, TriggerKind, TriggerStart};
