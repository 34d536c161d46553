//! Periodic Trigger: a cancellable named timer
//!
//! Each trigger owns one tokio task that fires a job every `period`. Ticks
//! never overlap: the next tick waits until the current job has settled.
//! Every job runs in its own task, so a panicking job is logged and the timer
//! keeps going.
//!
//! # Cancellation
//!
//! [`PeriodicTrigger::stop`] signals the timer and then awaits it. Once
//! `stop` returns, the timer task has ended and no further job will start.
//! An in-progress job is allowed to settle first. Dropping a trigger without
//! calling `stop` also ends the timer at its next wake-up.
//!
//! # Example
//!
//! ```no_run
//! use lifeline_core_resilience::periodic::{FirstTick, PeriodicTrigger};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let trigger = PeriodicTrigger::spawn("heartbeat", Duration::from_secs(30), FirstTick::Immediate, || async {
//!     tracing::info!("tick");
//! });
//!
//! // ... later
//! trigger.stop().await;
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error};

/// When the first tick fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstTick {
    /// Fire as soon as the trigger is spawned, then every period
    Immediate,
    /// Wait one full period before the first tick
    AfterPeriod,
}

/// A running periodic timer
#[derive(Debug)]
pub struct PeriodicTrigger {
    name: String,
    period: Duration,
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl PeriodicTrigger {
    /// Spawn a timer on the current tokio runtime.
    ///
    /// A zero `period` is raised to one millisecond.
    pub fn spawn<F, Fut>(
        name: impl Into<String>,
        period: Duration,
        first_tick: FirstTick,
        mut job: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let period = period.max(Duration::from_millis(1));
        let running = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicU64::new(0));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task_name = name.clone();
        let task_running = running.clone();
        let task_ticks = ticks.clone();

        let handle = tokio::spawn(async move {
            let start = match first_tick {
                FirstTick::Immediate => Instant::now(),
                FirstTick::AfterPeriod => Instant::now() + period,
            };
            let mut interval = time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    // Fires on stop() and when the trigger is dropped
                    _ = &mut shutdown_rx => break,

                    _ = interval.tick() => {
                        if !task_running.load(Ordering::Acquire) {
                            break;
                        }
                        task_ticks.fetch_add(1, Ordering::Relaxed);

                        if let Err(e) = tokio::spawn(job()).await {
                            if e.is_panic() {
                                error!("💥 Timer '{}': job panicked, timer keeps running", task_name);
                            }
                        }
                    }
                }
            }

            task_running.store(false, Ordering::Release);
            debug!("⏹️  Timer '{}' stopped", task_name);
        });

        debug!("⏱️  Timer '{}' started (period {:?})", name, period);

        Self {
            name,
            period,
            running,
            ticks,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Cancel the timer and wait for its task to end.
    pub async fn stop(self) {
        let Self {
            name,
            running,
            shutdown_tx,
            handle,
            ..
        } = self;

        running.store(false, Ordering::Release);
        if let Some(tx) = shutdown_tx {
            let _ = tx.send(());
        }

        if let Err(e) = handle.await {
            if e.is_panic() {
                error!("💥 Timer '{}' task panicked during shutdown", name);
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks fired so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_trigger(first_tick: FirstTick) -> (PeriodicTrigger, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let trigger = PeriodicTrigger::spawn("test", Duration::from_secs(10), first_tick, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        (trigger, count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_first_tick() {
        let (trigger, count) = counting_trigger(FirstTick::Immediate);

        // Ticks at t=0, 10, 20, 30
        time::sleep(Duration::from_secs(35)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert_eq!(trigger.ticks(), 4);

        trigger.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_period_first_tick() {
        let (trigger, count) = counting_trigger(FirstTick::AfterPeriod);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Ticks at t=10, 20, 30
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        trigger.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop() {
        let (trigger, count) = counting_trigger(FirstTick::Immediate);

        time::sleep(Duration::from_secs(15)).await;
        trigger.stop().await;
        let after_stop = count.load(Ordering::SeqCst);

        time::sleep(Duration::from_secs(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_ends_timer() {
        let (trigger, count) = counting_trigger(FirstTick::Immediate);

        time::sleep(Duration::from_secs(1)).await;
        drop(trigger);
        let after_drop = count.load(Ordering::SeqCst);

        time::sleep(Duration::from_secs(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_job_does_not_kill_timer() {
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let trigger = PeriodicTrigger::spawn(
            "flaky",
            Duration::from_secs(10),
            FirstTick::Immediate,
            move || {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        panic!("first tick blows up");
                    }
                }
            },
        );

        time::sleep(Duration::from_secs(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(trigger.is_running());

        trigger.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_clamped() {
        let trigger =
            PeriodicTrigger::spawn("fast", Duration::ZERO, FirstTick::AfterPeriod, || async {});
        assert_eq!(trigger.period(), Duration::from_millis(1));
        trigger.stop().await;
    }
}
