use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use measured_rate::{MeasuredRate, TickPolicy};
use tokio::{task::JoinSet, time};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Length of one sample interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    /// Number of tasks producing events
    #[arg(long, default_value_t = 4)]
    producers: usize,
    /// Pause between two events of a single producer, in milliseconds
    #[arg(long, default_value_t = 10)]
    event_period_ms: u64,
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,
    /// burst, delay or skip
    #[arg(long, default_value = "delay")]
    tick_policy: TickPolicy,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};
    fmt()
        .with_max_level(LevelFilter::INFO)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    anyhow::ensure!(args.event_period_ms > 0, "event period must be positive");

    let rate = MeasuredRate::builder()
        .name("demo")
        .sample_interval(Duration::from_millis(args.interval_ms))
        .tick_policy(args.tick_policy)
        .on_swap(|count| {
            tracing::debug!(count, "interval closed");
            Ok(())
        })
        .build()
        .context("failed to build measured rate")?;
    let rate = Arc::new(rate);

    let cancel = CancellationToken::new();
    let mut join_set = JoinSet::new();
    for id in 0..args.producers {
        let rate = Arc::clone(&rate);
        let cancel = cancel.clone();
        let period = Duration::from_millis(args.event_period_ms);
        join_set.spawn(async move {
            let mut ticker = time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => rate.increment(),
                }
            }
            tracing::debug!(id, "producer stopped");
        });
    }

    rate.start();

    let reader = rate.reader();
    let mut report = time::interval(rate.sample_interval());
    let deadline = time::sleep(Duration::from_secs(args.duration_secs));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = report.tick() => info!(count = reader.count(), "events in last interval"),
        }
    }

    cancel.cancel();
    while let Some(ret) = join_set.join_next().await {
        if let Err(e) = ret {
            error!(?e, "producer join error");
        }
    }
    rate.shutdown().await;

    info!(
        count = rate.get_count(),
        pending = rate.in_progress(),
        "measured rate finished"
    );

    Ok(())
}
