use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{runtime::Handle, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    config::{MeasuredRateBuilder, RateConfig},
    counter::{BucketCounter, RateReader},
    error::Result,
    ticker::{SwapHook, SwapTask},
};

/// Count of events seen during the last completed sample interval.
///
/// [`increment`](Self::increment) and [`get_count`](Self::get_count) are
/// lock-free. A background task on the tokio runtime freezes the running
/// count once per interval while the rate is active.
pub struct MeasuredRate {
    config: RateConfig,
    counter: Arc<BucketCounter>,
    hook: Option<SwapHook>,
    runtime: Handle,
    // Only taken by start/stop, never on the counting path.
    schedule: Mutex<Option<Schedule>>,
}

struct Schedule {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MeasuredRate {
    /// Creates an inactive rate on the current tokio runtime.
    pub fn new(sample_interval_millis: u64) -> Result<Self> {
        Self::builder()
            .sample_interval(Duration::from_millis(sample_interval_millis))
            .build()
    }

    pub fn builder() -> MeasuredRateBuilder {
        MeasuredRateBuilder::new()
    }

    pub(crate) fn from_parts(config: RateConfig, hook: Option<SwapHook>, runtime: Handle) -> Self {
        Self {
            config,
            counter: Arc::new(BucketCounter::new()),
            hook,
            runtime,
            schedule: Mutex::new(None),
        }
    }

    /// Begins swapping buckets every sample interval. No-op when active.
    pub fn start(&self) {
        let mut schedule = self.lock_schedule();
        if schedule.is_some() {
            debug!(name = %self.config.name, "measured rate already active");
            return;
        }

        let cancel = CancellationToken::new();
        let task = SwapTask::new(
            self.config.name.clone(),
            Arc::clone(&self.counter),
            Instant::now(),
            self.config.sample_interval,
            self.config.tick_policy,
            self.hook.clone(),
        );
        let task = self.runtime.spawn(task.run(cancel.clone()));
        *schedule = Some(Schedule { cancel, task });

        info!(
            name = %self.config.name,
            interval = ?self.config.sample_interval,
            policy = %self.config.tick_policy,
            "measured rate started"
        );
    }

    /// Cancels the schedule. No-op when inactive.
    ///
    /// A swap already running may finish, but none starts after this
    /// returns. Counters are left as they are.
    pub fn stop(&self) {
        let mut schedule = self.lock_schedule();
        match schedule.take() {
            Some(schedule) => {
                schedule.cancel.cancel();
                info!(name = %self.config.name, "measured rate stopped");
            }
            None => debug!(name = %self.config.name, "measured rate already stopped"),
        }
    }

    /// Like [`stop`](Self::stop), then waits for the background task to exit.
    pub async fn shutdown(&self) {
        let task = {
            let mut schedule = self.lock_schedule();
            let Some(schedule) = schedule.take() else {
                return;
            };
            schedule.cancel.cancel();
            schedule.task
        };
        if let Err(e) = task.await {
            error!(name = %self.config.name, ?e, "swap task join error");
        }
        info!(name = %self.config.name, "measured rate shut down");
    }

    pub fn is_active(&self) -> bool {
        self.lock_schedule().is_some()
    }

    /// Records one event in the current interval.
    pub fn increment(&self) {
        self.counter.increment();
    }

    /// Returns the count in the last completed sample interval.
    pub fn get_count(&self) -> u64 {
        self.counter.count()
    }

    /// Events recorded so far in the interval still in progress.
    pub fn in_progress(&self) -> u64 {
        self.counter.in_progress()
    }

    pub fn reader(&self) -> RateReader {
        self.counter.reader()
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn sample_interval(&self) -> Duration {
        self.config.sample_interval
    }

    fn lock_schedule(&self) -> MutexGuard<'_, Option<Schedule>> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MeasuredRate {
    fn drop(&mut self) {
        let schedule = self
            .schedule
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(schedule) = schedule {
            schedule.cancel.cancel();
        }
    }
}
