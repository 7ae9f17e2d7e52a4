use std::{sync::Arc, time::Duration};

use tokio::{runtime::Handle, time::Instant};

use crate::{
    error::{Error, Result},
    rate::MeasuredRate,
    ticker::{SwapHook, TickPolicy},
};

pub const DEFAULT_NAME: &str = "measured-rate";
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateConfig {
    /// Shows up in log lines of the swap task.
    pub name: String,
    pub sample_interval: Duration,
    pub tick_policy: TickPolicy,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            tick_policy: TickPolicy::default(),
        }
    }
}

impl RateConfig {
    /// Rejects a zero interval and one too long to schedule: the first two
    /// deadlines must be representable as an [`Instant`].
    pub fn validate(&self) -> Result<()> {
        let fits = Instant::now()
            .checked_add(self.sample_interval)
            .and_then(|first| first.checked_add(self.sample_interval))
            .is_some();
        if self.sample_interval.is_zero() || !fits {
            return Err(Error::InvalidInterval {
                interval: self.sample_interval,
            });
        }
        Ok(())
    }
}

/// Builder for a [`MeasuredRate`].
#[derive(Default)]
pub struct MeasuredRateBuilder {
    config: RateConfig,
    hook: Option<SwapHook>,
    runtime: Option<Handle>,
}

impl MeasuredRateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: RateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.config.sample_interval = interval;
        self
    }

    pub fn tick_policy(mut self, policy: TickPolicy) -> Self {
        self.config.tick_policy = policy;
        self
    }

    /// Register an observer called with each frozen count.
    ///
    /// Errors and panics from the hook are logged; they never stop the
    /// schedule.
    pub fn on_swap<F>(mut self, hook: F) -> Self
    where
        F: Fn(u64) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Runtime that drives the swap task. Defaults to the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<MeasuredRate> {
        self.config.validate()?;
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current()?,
        };
        Ok(MeasuredRate::from_parts(self.config, self.hook, runtime))
    }
}
