use std::time::Duration;

use tokio::runtime::TryCurrentError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("sample interval must be positive and schedulable, got {interval:?}")]
    InvalidInterval { interval: Duration },

    #[error("no tokio runtime to drive the swap task: {0}")]
    NoRuntime(#[from] TryCurrentError),
}

/// A fault raised while executing one tick of the swap task.
///
/// Faults are logged by the task and never stop the schedule.
#[derive(thiserror::Error, Debug)]
pub enum TickFault {
    #[error("swap hook failed: {0:#}")]
    Hook(anyhow::Error),

    #[error("swap panicked: {0}")]
    Panicked(String),
}
