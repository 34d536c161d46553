//! Unified event schema for Lifeline observability
//!
//! Every notable state change in the monitor and the orchestrator is
//! described by one [`EventPayload`] variant. The journal wraps payloads in a
//! [`LifelineEvent`] with a timestamp and a monotonic sequence number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A journaled event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifelineEvent {
    /// Monotonic sequence number, assigned by the journal
    pub sequence: u64,

    /// Event timestamp (UTC)
    pub timestamp: DateTime<Utc>,

    /// Event-specific payload
    pub payload: EventPayload,
}

impl LifelineEvent {
    /// Create an event stamped with the current time
    pub fn new(sequence: u64, payload: EventPayload) -> Self {
        Self {
            sequence,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Event payload variants
///
/// Serialized with a `type` tag so each JSON line is self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Monitor entered the Monitoring state
    MonitorStarted {
        threshold: f64,
        min_consecutive_below: u32,
        interval_secs: u64,
    },

    /// Monitor returned to Idle
    MonitorStopped,

    /// Monitor state and counters were cleared
    MonitorReset,

    /// A sampler call failed; the tick did not count
    SampleSkipped { reason: String },

    /// Hysteresis condition met and the reactor was dispatched
    TriggerFired {
        value: f64,
        consecutive_checks: u32,
        action: String,
    },

    /// Hysteresis condition met while a reaction was still in flight
    TriggerSuppressed { value: f64, consecutive_checks: u32 },

    /// A dispatched reaction settled
    ReactionCompleted {
        success: bool,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// A remediation cycle finished
    CycleCompleted {
        tasks: usize,
        success_count: usize,
        failure_count: usize,
        duration_ms: u64,
        metrics: BTreeMap<String, f64>,
    },

    /// A remediation cycle was refused because another was active
    CycleRejected,
}

impl EventPayload {
    /// Stable short name, matching the serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::MonitorStarted { .. } => "monitor_started",
            EventPayload::MonitorStopped => "monitor_stopped",
            EventPayload::MonitorReset => "monitor_reset",
            EventPayload::SampleSkipped { .. } => "sample_skipped",
            EventPayload::TriggerFired { .. } => "trigger_fired",
            EventPayload::TriggerSuppressed { .. } => "trigger_suppressed",
            EventPayload::ReactionCompleted { .. } => "reaction_completed",
            EventPayload::CycleCompleted { .. } => "cycle_completed",
            EventPayload::CycleRejected => "cycle_rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_tagging() {
        let payload = EventPayload::TriggerFired {
            value: 0.0,
            consecutive_checks: 2,
            action: "orchestrator_cycle".to_string(),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "trigger_fired");
        assert_eq!(json["consecutive_checks"], 2);
        assert_eq!(json["type"], payload.kind());
    }

    #[test]
    fn test_unit_variant_tagging() {
        let json = serde_json::to_string(&EventPayload::CycleRejected).unwrap();
        assert_eq!(json, r#"{"type":"cycle_rejected"}"#);
    }

    #[test]
    fn test_reaction_error_omitted_when_absent() {
        let payload = EventPayload::ReactionCompleted {
            success: true,
            duration_ms: 12,
            error: None,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("error"));

        let back: EventPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_event_roundtrip() {
        let mut metrics = BTreeMap::new();
        metrics.insert("total_revenue".to_string(), 150.0);

        let event = LifelineEvent::new(
            7,
            EventPayload::CycleCompleted {
                tasks: 3,
                success_count: 2,
                failure_count: 1,
                duration_ms: 5000,
                metrics,
            },
        );

        let line = serde_json::to_string(&event).unwrap();
        let parsed: LifelineEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, event);
    }
}
