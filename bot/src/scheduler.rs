//! Fixed-interval poll scheduler.
//!
//! The next tick is scheduled from the current tick's completion
//! handler, never from wall clock: a slow tick stretches the effective
//! period instead of stacking concurrent ticks, and a failing or even
//! panicking tick never stops the loop.

use std::time::Duration;

use futures::FutureExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one poll tick, surfaced for observability instead of
/// being swallowed into logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Completed { watches: usize, live: usize },
    /// Upstream credentials are not configured; the tick is a no-op.
    NoCredentials,
    Failed(String),
}

async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

/// Run `tick` once per interval until `shutdown` fires.
pub async fn run_poll_loop<F, Fut>(interval: Duration, shutdown: CancellationToken, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TickOutcome>,
{
    let interval = interval.max(MIN_POLL_INTERVAL);

    loop {
        let outcome = match std::panic::AssertUnwindSafe(tick()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => TickOutcome::Failed("tick panicked".to_string()),
        };

        match &outcome {
            TickOutcome::Completed { watches, live } => {
                tracing::debug!(watches, live, "poll tick completed");
            }
            TickOutcome::NoCredentials => {
                tracing::trace!("poll tick skipped, no credentials");
            }
            TickOutcome::Failed(reason) => {
                tracing::error!(reason, "poll tick failed");
            }
        }

        if sleep_or_cancel(&shutdown, interval).await {
            tracing::info!("poll loop stopped (shutdown)");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn failing_tick_does_not_stop_the_loop() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        let loop_ticks = ticks.clone();
        let loop_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move {
            run_poll_loop(Duration::from_secs(15), loop_shutdown, move || {
                let n = loop_ticks.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        TickOutcome::Failed("boom".to_string())
                    } else {
                        TickOutcome::Completed { watches: 0, live: 0 }
                    }
                }
            })
            .await;
        });

        // Paused clock: sleeps auto-advance, so a minute of virtual
        // time runs several ticks.
        sleep(Duration::from_secs(61)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(ticks.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_tick_still_reschedules() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        let loop_ticks = ticks.clone();
        let loop_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move {
            run_poll_loop(Duration::from_secs(15), loop_shutdown, move || {
                let n = loop_ticks.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        panic!("tick exploded");
                    }
                    TickOutcome::Completed { watches: 0, live: 0 }
                }
            })
            .await;
        });

        sleep(Duration::from_secs(31)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_loop() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let loop_ticks = ticks.clone();
        run_poll_loop(Duration::from_secs(15), shutdown, move || {
            loop_ticks.fetch_add(1, Ordering::SeqCst);
            async { TickOutcome::Completed { watches: 0, live: 0 } }
        })
        .await;

        // The first tick runs, then the cancelled token stops the loop.
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }
}
