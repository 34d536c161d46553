//! Lifeline Core Resilience: Pure-logic coordination primitives
//!
//! # Overview
//!
//! This crate provides the small building blocks the monitor and the
//! orchestrator are assembled from:
//!
//! - **Periodic Trigger**: Named, cancellable timer whose ticks never overlap
//! - **Single-Flight Guard**: Atomic admission control with drop-released permits
//! - **Bounded Ring**: Fixed-capacity history that evicts the oldest entry
//!
//! # Key Principles
//!
//! This crate has zero knowledge of:
//! - What is being sampled or remediated
//! - Network protocols (HTTP, gRPC)
//! - Persistence
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Periodic Trigger                  │  ← Drives work on a schedule
//! │  (interval, stop = acknowledged)        │
//! └─────────────┬───────────────────────────┘
//!               │ tick
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Single-Flight Guard               │  ← One cycle at a time
//! │  (compare-and-set, RAII release)        │
//! └─────────────┬───────────────────────────┘
//!               │ outcome
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Bounded Ring                      │  ← History without growth
//! │  (oldest evicted, drop counters)        │
//! └─────────────────────────────────────────┘
//! ```

pub mod periodic;
pub mod ring;
pub mod single_flight;

// Re-export main types for convenience
pub use periodic::{FirstTick, PeriodicTrigger};
pub use ring::{BoundedRing, RingStats};
pub use single_flight::{FlightPermit, FlightStats, SingleFlight};

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use lifeline_core_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::periodic::{FirstTick, PeriodicTrigger};
    pub use super::ring::BoundedRing;
    pub use super::single_flight::{FlightPermit, SingleFlight};
}
