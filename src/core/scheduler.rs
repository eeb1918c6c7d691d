use crate::domain::model::PassReport;
use crate::domain::ports::Pipeline;
use crate::utils::error::WatchError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Upper bound on the tick period; keeps deadline arithmetic inside `Instant`'s range.
const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

#[derive(Debug)]
pub enum TriggerOutcome {
    Completed(PassReport),
    Failed(WatchError),
    /// Another pass was still running; this trigger was dropped.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    /// How long shutdown waits for an in-flight pass before abandoning it.
    pub shutdown_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30 * 60),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

/// Runs passes of a [`Pipeline`] once at startup and then on a fixed cadence,
/// never more than one at a time.
pub struct Scheduler<P: Pipeline> {
    pipeline: P,
    config: SchedulerConfig,
    running: AtomicBool,
}

/// Returns the scheduler to Idle when the pass ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P: Pipeline> Scheduler<P> {
    pub fn new(pipeline: P, config: SchedulerConfig) -> Self {
        Self {
            pipeline,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Run one pass unless one is already running. Errors are logged here and
    /// handed back; they never escape as a panic or abort the caller.
    pub async fn trigger(&self) -> TriggerOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("⏭️ Previous pass still running, skipping this tick");
            return TriggerOutcome::Skipped;
        }
        let _guard = RunningGuard(&self.running);

        tracing::info!("🔍 Checking for new jobs...");
        let started = std::time::Instant::now();

        match self.pipeline.run_pass().await {
            Ok(report) => {
                tracing::info!(
                    "✅ Pass finished in {:?}: scraped={}, matched={}, new={}, notified={}",
                    started.elapsed(),
                    report.scraped,
                    report.matched,
                    report.new_jobs,
                    report.notified
                );
                TriggerOutcome::Completed(report)
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    "⚠️ Pass failed, retrying on the next tick: {} (Category: {:?})",
                    e,
                    e.category()
                );
                TriggerOutcome::Failed(e)
            }
            Err(e) => {
                tracing::error!(
                    "❌ Pass failed: {} (Category: {:?}, Severity: {:?})",
                    e,
                    e.category(),
                    e.severity()
                );
                tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                TriggerOutcome::Failed(e)
            }
        }
    }
}

impl<P: Pipeline + 'static> Scheduler<P> {
    fn spawn_pass(self: &Arc<Self>) -> JoinHandle<TriggerOutcome> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.trigger().await })
    }

    /// Startup pass, then one pass per interval until `shutdown` resolves.
    ///
    /// Passes run on their own task so a shutdown signal is observed while a
    /// pass is in flight; that pass gets `shutdown_grace` to finish.
    pub async fn run<S>(self: Arc<Self>, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let period = self.config.interval.min(MAX_INTERVAL);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            "🚀 Job watcher running; checking for new jobs every {:?}",
            period
        );
        let mut in_flight = Some(self.spawn_pass());

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("🛑 Shutdown requested, no further passes will start");
                    break;
                }
                _ = ticker.tick() => {
                    if self.state() == SchedulerState::Running {
                        tracing::warn!("⏭️ Previous pass still running, skipping this tick");
                        continue;
                    }
                    in_flight = Some(self.spawn_pass());
                }
            }
        }

        if let Some(handle) = in_flight {
            self.drain(handle).await;
        }
    }

    /// A single pass that gives way to `shutdown`.
    ///
    /// Returns `None` when interrupted; the pass then gets `shutdown_grace`
    /// like any other in-flight pass.
    pub async fn run_once<S>(self: Arc<Self>, shutdown: S) -> Option<TriggerOutcome>
    where
        S: Future<Output = ()>,
    {
        let mut handle = self.spawn_pass();

        tokio::select! {
            joined = &mut handle => match joined {
                Ok(outcome) => Some(outcome),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(_) => None,
            },
            _ = shutdown => {
                tracing::info!("🛑 Shutdown requested during the pass");
                self.drain(handle).await;
                None
            }
        }
    }

    async fn drain(&self, mut handle: JoinHandle<TriggerOutcome>) {
        if handle.is_finished() {
            return;
        }

        tracing::info!(
            "⏳ Waiting up to {:?} for the running pass to finish",
            self.config.shutdown_grace
        );
        match tokio::time::timeout(self.config.shutdown_grace, &mut handle).await {
            Ok(Ok(_)) => tracing::info!("Running pass finished"),
            Ok(Err(e)) => tracing::error!("Pass task ended abnormally: {}", e),
            Err(_) => {
                tracing::warn!("Running pass did not finish in time, abandoning it");
                handle.abort();
            }
        }
    }
}
