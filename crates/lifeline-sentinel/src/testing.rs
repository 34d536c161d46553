//! Test doubles for the Sentinel's collaborators
//!
//! Deterministic stand-ins for the sampler, the reactor and the subsystem
//! invoker, usable from unit tests and from downstream integration tests.

use crate::error::{InvokeError, SampleError, SentinelError};
use crate::medic::{SubsystemEndpoint, SubsystemInvoker};
use crate::reactor::{Reactor, TriggerContext};
use crate::sampler::{Reading, Sampler};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sampler that replays a fixed script of readings
///
/// Once the script runs out it returns the fallback value, or an error when
/// no fallback is set.
#[derive(Debug, Default)]
pub struct ScriptedSampler {
    script: Mutex<VecDeque<Result<f64, String>>>,
    fallback: Option<f64>,
    calls: AtomicU64,
}

impl ScriptedSampler {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self::from_results(values.into_iter().map(Ok))
    }

    /// Script with failures; `Err(reason)` entries become skipped ticks
    pub fn from_results(results: impl IntoIterator<Item = Result<f64, String>>) -> Self {
        Self {
            script: Mutex::new(results.into_iter().collect()),
            fallback: None,
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_fallback(mut self, value: f64) -> Self {
        self.fallback = Some(value);
        self
    }

    /// Number of sample calls so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sampler for ScriptedSampler {
    async fn sample(&self) -> Result<Reading, SampleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = lock(&self.script).pop_front();
        match next {
            Some(Ok(value)) => Ok(Reading::new(value)),
            Some(Err(reason)) => Err(SampleError::Unavailable(reason)),
            None => match self.fallback {
                Some(value) => Ok(Reading::new(value)),
                None => Err(SampleError::Unavailable("script exhausted".to_string())),
            },
        }
    }
}

/// Reactor that counts invocations
///
/// A gated reactor blocks inside `react` until the gate is opened, which
/// keeps a reaction in flight for as long as a test needs.
#[derive(Debug, Default)]
pub struct CountingReactor {
    invocations: AtomicU64,
    completed: AtomicU64,
    gate: Option<Arc<Notify>>,
    fail_with: Option<String>,
    contexts: Mutex<Vec<TriggerContext>>,
}

impl CountingReactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reactor that waits for `gate.notify_one()` before settling
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Reactor whose every reaction fails
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail_with: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Reactions started
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Reactions settled
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Trigger contexts seen, in order
    pub fn contexts(&self) -> Vec<TriggerContext> {
        lock(&self.contexts).clone()
    }

    /// Yield until at least `n` reactions have started
    pub async fn wait_for(&self, n: u64) {
        while self.invocations() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Reactor for CountingReactor {
    fn action(&self) -> &str {
        "counting_reactor"
    }

    async fn react(&self, trigger: TriggerContext) -> Result<(), SentinelError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        lock(&self.contexts).push(trigger);

        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(ref reason) => Err(SentinelError::Reaction(reason.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
enum StubResponse {
    Json(Value),
    Error(String),
    Delay(Duration, Value),
    Hang,
}

/// Invoker with a canned response per subsystem id
///
/// Ids without a response fail with [`InvokeError::Unavailable`].
#[derive(Debug, Default)]
pub struct StubInvoker {
    responses: HashMap<String, StubResponse>,
    calls: Mutex<Vec<String>>,
}

impl StubInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `id` with `payload`
    pub fn respond(mut self, id: &str, payload: Value) -> Self {
        self.responses
            .insert(id.to_string(), StubResponse::Json(payload));
        self
    }

    /// Fail `id` with `reason`
    pub fn fail(mut self, id: &str, reason: &str) -> Self {
        self.responses
            .insert(id.to_string(), StubResponse::Error(reason.to_string()));
        self
    }

    /// Answer `id` with `payload` after `delay`
    pub fn delay(mut self, id: &str, delay: Duration, payload: Value) -> Self {
        self.responses
            .insert(id.to_string(), StubResponse::Delay(delay, payload));
        self
    }

    /// Never answer `id`
    pub fn hang(mut self, id: &str) -> Self {
        self.responses.insert(id.to_string(), StubResponse::Hang);
        self
    }

    /// Total calls made
    pub fn calls(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Calls made to one subsystem
    pub fn calls_for(&self, id: &str) -> usize {
        lock(&self.calls).iter().filter(|c| c.as_str() == id).count()
    }
}

#[async_trait]
impl SubsystemInvoker for StubInvoker {
    async fn invoke(&self, endpoint: &SubsystemEndpoint) -> Result<Value, InvokeError> {
        lock(&self.calls).push(endpoint.id.clone());

        match self.responses.get(&endpoint.id).cloned() {
            Some(StubResponse::Json(payload)) => Ok(payload),
            Some(StubResponse::Error(reason)) => Err(InvokeError::Unavailable(reason)),
            Some(StubResponse::Delay(delay, payload)) => {
                tokio::time::sleep(delay).await;
                Ok(payload)
            }
            Some(StubResponse::Hang) => std::future::pending().await,
            None => Err(InvokeError::Unavailable(format!(
                "no stub for '{}'",
                endpoint.id
            ))),
        }
    }
}
