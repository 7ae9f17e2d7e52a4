use std::{sync::Arc, time::Duration};

use measured_rate::MeasuredRate;
use tokio::time::sleep;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn counts_follow_completed_intervals() -> anyhow::Result<()> {
    let rate = MeasuredRate::new(100)?;
    rate.start();

    // t = 0..50ms
    for _ in 0..5 {
        rate.increment();
        sleep(ms(10)).await;
    }
    assert_eq!(rate.get_count(), 0);

    sleep(ms(60)).await; // t = 110ms
    assert_eq!(rate.get_count(), 5);

    for _ in 0..3 {
        rate.increment();
        sleep(ms(10)).await;
    }
    assert_eq!(rate.get_count(), 5);

    sleep(ms(70)).await; // t = 210ms
    assert_eq!(rate.get_count(), 3);

    rate.stop();
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn schedule_is_timed_from_start_call() -> anyhow::Result<()> {
    let rate = MeasuredRate::new(100)?;
    rate.start();
    rate.increment();

    // Time passes before the swap task gets its first poll.
    tokio::time::advance(ms(50)).await;
    sleep(ms(60)).await; // t = 110ms
    assert_eq!(rate.get_count(), 1);

    rate.stop();
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn quiet_interval_reports_zero() -> anyhow::Result<()> {
    let rate = MeasuredRate::new(100)?;
    rate.start();
    rate.increment();

    sleep(ms(110)).await;
    assert_eq!(rate.get_count(), 1);

    sleep(ms(100)).await;
    assert_eq!(rate.get_count(), 0);

    rate.stop();
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn concurrent_callers_lose_nothing() -> anyhow::Result<()> {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 5_000;

    let rate = Arc::new(MeasuredRate::new(100)?);
    rate.start();

    std::thread::scope(|s| {
        for _ in 0..THREADS {
            let rate = &rate;
            s.spawn(move || {
                for _ in 0..PER_THREAD {
                    rate.increment();
                }
            });
        }
    });

    sleep(ms(110)).await;
    assert_eq!(rate.get_count(), THREADS * PER_THREAD);

    rate.stop();
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn double_start_schedules_once() -> anyhow::Result<()> {
    let rate = MeasuredRate::new(100)?;
    rate.start();
    rate.start();

    for _ in 0..4 {
        rate.increment();
    }
    // A second schedule would swap again at the same instant and leave 0.
    sleep(ms(110)).await;
    assert_eq!(rate.get_count(), 4);

    rate.stop();
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stop_freezes_last_count() -> anyhow::Result<()> {
    let rate = MeasuredRate::new(100)?;
    rate.start();
    rate.increment();
    rate.increment();
    sleep(ms(110)).await;
    assert_eq!(rate.get_count(), 2);

    rate.stop();
    for _ in 0..10 {
        rate.increment();
        sleep(ms(100)).await;
    }
    assert_eq!(rate.get_count(), 2);
    assert_eq!(rate.in_progress(), 10);
    Ok(())
}

// Increments recorded while stopped are not discarded: they are frozen by the
// first swap after the next start.
#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn increments_while_stopped_carry_into_next_interval() -> anyhow::Result<()> {
    let rate = MeasuredRate::new(100)?;
    rate.start();
    sleep(ms(110)).await;
    assert_eq!(rate.get_count(), 0);
    rate.stop();

    rate.increment();
    rate.increment();
    sleep(ms(500)).await;
    assert_eq!(rate.get_count(), 0);

    rate.start();
    rate.increment();
    sleep(ms(110)).await;
    assert_eq!(rate.get_count(), 3);

    rate.stop();
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn reader_polls_without_owning_rate() -> anyhow::Result<()> {
    let rate = MeasuredRate::builder()
        .name("renewals")
        .sample_interval(ms(100))
        .build()?;
    let reader = rate.reader();
    rate.start();

    rate.increment();
    sleep(ms(110)).await;
    assert_eq!(reader.count(), 1);

    rate.shutdown().await;
    drop(rate);
    assert_eq!(reader.count(), 1);
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn faulty_hook_does_not_stop_measuring() -> anyhow::Result<()> {
    let rate = MeasuredRate::builder()
        .sample_interval(ms(100))
        .on_swap(|count| {
            anyhow::ensure!(count == 0, "unexpected traffic: {count}");
            Ok(())
        })
        .build()?;
    rate.start();
    sleep(ms(10)).await;

    for round in 1..=3 {
        for _ in 0..round {
            rate.increment();
        }
        sleep(ms(100)).await;
        assert_eq!(rate.get_count(), round);
    }

    rate.stop();
    Ok(())
}
