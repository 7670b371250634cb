//! Fixed-interval refresh for the watch commands.
//!
//! A watch command re-renders on every tick until Ctrl-C or until the tick
//! asks to stop (for instance after the session is gone). Fetch errors
//! inside a tick are logged and rendered as empty; the next tick is the
//! only retry.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, warn};

use crate::errors::ApiError;

/// Receiver that flips to `true` on Ctrl-C.
pub fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            // Keep the sender alive so watchers are not shut down.
            std::future::pending::<()>().await;
        }
        let _ = tx.send(true);
    });
    rx
}

/// Resolves once `shutdown` is true or its sender is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Run `tick` immediately and then every `period` until `shutdown` turns
/// true or `tick` breaks. A tick still in flight when `shutdown` turns true
/// is dropped. Returns the number of ticks started.
pub async fn poll_until<F, Fut>(
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ControlFlow<()>>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0;

    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => break,
            _ = ticker.tick() => {}
        }
        ticks += 1;
        let flow = tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => break,
            flow = tick() => flow,
        };
        if flow.is_break() {
            break;
        }
    }
    debug!(ticks, "polling stopped");
    ticks
}

/// Outcome of one refresh in a watch loop: keep going unless the session
/// is gone.
pub fn continue_unless_signed_out<T>(result: &Result<T, ApiError>) -> ControlFlow<()> {
    match result {
        Err(e) if e.requires_sign_in() => ControlFlow::Break(()),
        _ => ControlFlow::Continue(()),
    }
}

/// A failed list fetch renders as an empty list.
pub fn or_empty<T>(what: &str, result: Result<Vec<T>, ApiError>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            error!(what, error = %e, "fetch failed, showing nothing");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FAST: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn stops_when_tick_breaks() {
        let (_tx, rx) = watch::channel(false);
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();

        let ticks = poll_until(FAST, rx, move || {
            let seen = seen.clone();
            async move {
                if seen.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
        })
        .await;

        assert_eq!(ticks, 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_shutdown_signal() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(poll_until(FAST, rx, || async { ControlFlow::Continue(()) }));

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        let ticks = handle.await.unwrap();
        assert!(ticks >= 1);
    }

    #[tokio::test]
    async fn shutdown_interrupts_running_tick() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(poll_until(FAST, rx, std::future::pending::<ControlFlow<()>>));

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        let ticks = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poll_until kept waiting on the tick")
            .unwrap();
        assert_eq!(ticks, 1);
    }

    #[tokio::test]
    async fn already_shut_down_runs_nothing() {
        let (_tx, rx) = watch::channel(true);
        let ticks = poll_until(FAST, rx, || async { ControlFlow::Continue(()) }).await;
        assert_eq!(ticks, 0);
    }

    #[test]
    fn sign_in_errors_stop_watching() {
        let expired: Result<(), ApiError> = Err(ApiError::SessionExpired);
        assert!(continue_unless_signed_out(&expired).is_break());

        let limited: Result<(), ApiError> = Err(ApiError::RateLimited);
        assert!(continue_unless_signed_out(&limited).is_continue());
        assert!(continue_unless_signed_out(&Ok::<_, ApiError>(())).is_continue());
    }

    #[test]
    fn failed_fetch_is_empty() {
        let items: Vec<i64> = or_empty("jobs", Err(ApiError::Unexpected));
        assert!(items.is_empty());
        assert_eq!(or_empty("jobs", Ok(vec![1, 2])), vec![1, 2]);
    }
}
