//! Lifeline Observability: event journal and telemetry
//!
//! Two pillars:
//!
//! 1. **Event Journal**: Every notable monitor/orchestrator state change is
//!    recorded through the [`EventSink`] trait. The stock [`Journal`] keeps a
//!    bounded in-memory history and can append JSON Lines to disk for an
//!    external collector.
//!
//! 2. **Real-Time Monitoring (Prometheus)**: Counters and gauges such as
//!    `lifeline_cycles_total` and `lifeline_cycle_active`, rendered with
//!    [`metrics::gather_text`].
//!
//! Troubleshooting logs go through `tracing`; use `RUST_LOG=debug`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lifeline_observability::{EventPayload, EventSink, Journal};
//! use std::path::Path;
//!
//! let journal = Journal::with_file(1000, Path::new("events.jsonl")).unwrap();
//! journal.record_event(EventPayload::TriggerFired {
//!     value: 0.0,
//!     consecutive_checks: 2,
//!     action: "orchestrator_cycle".to_string(),
//! });
//! ```

pub mod event;
pub mod journal;
pub mod metrics;

pub use event::{EventPayload, LifelineEvent};
pub use journal::{read_journal_file, EventSink, Journal, JournalError, JournalStats, NullSink};
