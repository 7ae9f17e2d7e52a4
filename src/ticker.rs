use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use strum::{Display, EnumString};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::{counter::BucketCounter, error::TickFault};

/// Observer called with the frozen count after every swap.
pub type SwapHook = Arc<dyn Fn(u64) -> anyhow::Result<()> + Send + Sync>;

/// What the swap task does with ticks it could not fire on time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum TickPolicy {
    /// Fire missed ticks back to back until caught up.
    Burst,
    /// Restart the period from the late tick (fixed delay).
    #[default]
    Delay,
    /// Drop missed ticks and wait for the next aligned one.
    Skip,
}

impl From<TickPolicy> for MissedTickBehavior {
    fn from(policy: TickPolicy) -> Self {
        match policy {
            TickPolicy::Burst => MissedTickBehavior::Burst,
            TickPolicy::Delay => MissedTickBehavior::Delay,
            TickPolicy::Skip => MissedTickBehavior::Skip,
        }
    }
}

/// Swaps the buckets of `counter` and feeds the frozen value to `hook`.
///
/// Errors and panics from either step are turned into a [`TickFault`]. The
/// swap happens before the hook runs, so a faulty hook cannot lose events.
pub fn guarded_swap(counter: &BucketCounter, hook: Option<&SwapHook>) -> Result<u64, TickFault> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let frozen = counter.swap();
        match hook {
            Some(hook) => hook(frozen).map(|()| frozen),
            None => Ok(frozen),
        }
    }));

    match outcome {
        Ok(Ok(frozen)) => Ok(frozen),
        Ok(Err(e)) => Err(TickFault::Hook(e)),
        Err(payload) => Err(TickFault::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

pub(crate) struct SwapTask {
    name: String,
    counter: Arc<BucketCounter>,
    started: Instant,
    period: Duration,
    policy: TickPolicy,
    hook: Option<SwapHook>,
}

impl SwapTask {
    pub(crate) fn new(
        name: String,
        counter: Arc<BucketCounter>,
        started: Instant,
        period: Duration,
        policy: TickPolicy,
        hook: Option<SwapHook>,
    ) -> Self {
        Self {
            name,
            counter,
            started,
            period,
            policy,
            hook,
        }
    }

    /// Swaps once per period until `cancel` fires.
    ///
    /// The first swap happens one full period after `started`, however late
    /// the runtime first polls the task.
    pub(crate) async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval_at(self.started + self.period, self.period);
        ticker.set_missed_tick_behavior(self.policy.into());

        debug!(name = %self.name, "swap task started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.tick(),
            }
        }

        debug!(name = %self.name, "swap task stopped");
    }

    fn tick(&self) {
        match guarded_swap(&self.counter, self.hook.as_ref()) {
            Ok(count) => trace!(name = %self.name, count, "swapped buckets"),
            Err(error) => error!(name = %self.name, %error, "cannot reset the measured rate"),
        }
    }
}
