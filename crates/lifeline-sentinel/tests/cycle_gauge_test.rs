//! Cycle-active gauge
//!
//! The Prometheus registry is process-global, so this binary holds a single
//! test and nothing else flips the gauge underneath it.

use async_trait::async_trait;
use lifeline_observability::{metrics, NullSink};
use lifeline_sentinel::testing::StubInvoker;
use lifeline_sentinel::{
    AutomationOrchestrator, InvokeError, OrchestratorPolicy, SubsystemEndpoint, SubsystemInvoker,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn cycle_active() -> f64 {
    metrics::CYCLE_ACTIVE.get().map(|g| g.get()).unwrap_or(-1.0)
}

struct PanicOn {
    id: &'static str,
    rest: StubInvoker,
}

#[async_trait]
impl SubsystemInvoker for PanicOn {
    async fn invoke(&self, endpoint: &SubsystemEndpoint) -> Result<Value, InvokeError> {
        if endpoint.id == self.id {
            panic!("subsystem client bug");
        }
        self.rest.invoke(endpoint).await
    }
}

fn orchestrator(invoker: Arc<dyn SubsystemInvoker>, ids: &[&str]) -> Arc<AutomationOrchestrator> {
    let roster = ids
        .iter()
        .map(|id| SubsystemEndpoint::new(*id, format!("/api/{}", id)))
        .collect();
    Arc::new(
        AutomationOrchestrator::new(
            roster,
            invoker,
            OrchestratorPolicy::default(),
            Arc::new(NullSink),
        )
        .unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_gauge_cleared_after_panic_and_dropped_cycle() {
    // A panicking subsystem still ends the cycle with the gauge at 0
    let invoker = Arc::new(PanicOn {
        id: "bad",
        rest: StubInvoker::new()
            .respond("good", json!({ "success": true }))
            .respond("good2", json!({ "success": true })),
    });
    let orch = orchestrator(invoker, &["good", "bad", "good2"]);

    let result = orch.activate_all().await.unwrap();
    assert_eq!(result.tasks.len(), 3);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 1);
    assert_eq!(cycle_active(), 0.0);

    // A cycle future dropped mid-flight clears it too
    let hanging = orchestrator(Arc::new(StubInvoker::new().hang("slow")), &["slow"]);
    let running = {
        let hanging = hanging.clone();
        tokio::spawn(async move { hanging.activate_all().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cycle_active(), 1.0);
    assert!(hanging.is_active());

    running.abort();
    assert!(running.await.unwrap_err().is_cancelled());

    assert_eq!(cycle_active(), 0.0);
    assert!(!hanging.is_active());
}
