//! Event count over the most recently completed fixed-length interval.
//!
//! A [`MeasuredRate`] keeps two buckets: one accumulating events for the
//! interval in progress and one holding the frozen total of the previous
//! interval. Callers bump the first with [`MeasuredRate::increment`] and read
//! the second with [`MeasuredRate::get_count`]; both are single atomic
//! operations. Once started, a background tokio task swaps the buckets every
//! sample interval.
//!
//! ```
//! use measured_rate::MeasuredRate;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> measured_rate::Result<()> {
//! let rate = MeasuredRate::new(60_000)?;
//! rate.start();
//!
//! rate.increment();
//! // Nothing has been frozen yet.
//! assert_eq!(rate.get_count(), 0);
//!
//! rate.stop();
//! # Ok(())
//! # }
//! ```

mod config;
mod counter;
mod error;
mod rate;
mod ticker;

pub use config::{MeasuredRateBuilder, RateConfig, DEFAULT_NAME, DEFAULT_SAMPLE_INTERVAL};
pub use counter::{BucketCounter, RateReader};
pub use error::{Error, Result, TickFault};
pub use rate::MeasuredRate;
pub use ticker::{guarded_swap, SwapHook, TickPolicy};
