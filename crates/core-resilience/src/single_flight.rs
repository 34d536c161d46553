//! Single-Flight Guard: at most one holder at a time
//!
//! Admission is an atomic compare-and-set, so concurrent callers race safely
//! even on a multi-threaded runtime. Losers are rejected immediately rather
//! than queued. The returned [`FlightPermit`] releases the guard on drop,
//! which covers early returns, panics and cancelled futures alike.
//!
//! # Example
//!
//! ```
//! use lifeline_core_resilience::single_flight::SingleFlight;
//!
//! let guard = SingleFlight::new();
//!
//! let permit = guard.try_acquire().expect("idle guard admits");
//! assert!(guard.is_active());
//! assert!(guard.try_acquire().is_none());
//!
//! drop(permit);
//! assert!(!guard.is_active());
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Lock-free single-flight admission guard
#[derive(Debug, Default)]
pub struct SingleFlight {
    active: AtomicBool,
    admitted: AtomicU64,
    rejected: AtomicU64,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to become the single in-flight holder.
    ///
    /// Returns `None` when another holder is active.
    pub fn try_acquire(&self) -> Option<FlightPermit<'_>> {
        match self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                self.admitted.fetch_add(1, Ordering::Relaxed);
                Some(FlightPermit { guard: self })
            }
            Err(_) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Whether a holder is currently in flight
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> FlightStats {
        FlightStats {
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Proof of admission. Dropping it reopens the guard.
#[derive(Debug)]
#[must_use = "the guard is released as soon as the permit is dropped"]
pub struct FlightPermit<'a> {
    guard: &'a SingleFlight,
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.guard.active.store(false, Ordering::Release);
    }
}

/// Admission counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlightStats {
    pub admitted: u64,
    pub rejected: u64,
}
