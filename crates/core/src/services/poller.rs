//! Periodic refresh of mounted views.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dashboard_common::AppResult;
use dashboard_common::config::SyncConfig;

/// A view that can be refreshed on a timer.
#[async_trait]
pub trait Refresh: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Token cancelled when the view unmounts.
    fn lifecycle(&self) -> CancellationToken;

    /// Reload the view from the backend.
    async fn refresh(&self) -> AppResult<()>;
}

/// Timer settings for [`Poller::mount`].
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    period: Duration,
}

impl Poller {
    /// Poll every `period`.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Poller using `poll_interval_secs` from the `[sync]` section.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.poll_interval())
    }

    /// Start refreshing `view`. The first refresh runs immediately.
    ///
    /// The timer stops when the view unmounts or the handle is stopped or
    /// dropped. Refresh failures are logged and never stop it.
    pub fn mount<V: Refresh>(self, view: Arc<V>) -> PollHandle {
        let token = view.lifecycle().child_token();
        let refreshes = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn({
            let token = token.clone();
            let refreshes = refreshes.clone();
            async move {
                let mut ticker = interval(self.period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                info!(view = view.name(), period = ?self.period, "Polling started");

                loop {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => break,
                        _ = ticker.tick() => {}
                    }

                    let n = refreshes.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(view = view.name(), tick = n, "Polling");
                    let result = tokio::select! {
                        biased;
                        () = token.cancelled() => break,
                        result = view.refresh() => result,
                    };
                    if let Err(e) = result {
                        warn!(view = view.name(), error = %e, "Poll refresh failed");
                    }
                }

                info!(view = view.name(), "Polling stopped");
            }
        });

        PollHandle {
            token,
            task: Some(task),
            refreshes,
        }
    }
}

/// Running poll loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    refreshes: Arc<AtomicU64>,
}

impl PollHandle {
    /// Refreshes started so far, including the mount refresh.
    #[must_use]
    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Whether the loop is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait for it to exit.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "Poll task ended abnormally");
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dashboard_common::AppError;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counter {
        calls: AtomicUsize,
        fail: bool,
        lifecycle: CancellationToken,
    }

    #[async_trait]
    impl Refresh for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn lifecycle(&self) -> CancellationToken {
            self.lifecycle.clone()
        }

        async fn refresh(&self) -> AppResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Network("down".into()));
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_is_immediate() {
        let view = Arc::new(Counter::default());
        let handle = Poller::new(Duration::from_secs(30)).mount(view.clone());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(view.calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.refreshes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_polling() {
        let view = Arc::new(Counter {
            fail: true,
            ..Counter::default()
        });
        let handle = Poller::new(Duration::from_secs(30)).mount(view.clone());

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(view.calls.load(Ordering::SeqCst), 3);
        assert!(handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_stops_polling() {
        let view = Arc::new(Counter::default());
        let handle = Poller::new(Duration::from_secs(30)).mount(view.clone());
        tokio::time::sleep(Duration::from_secs(1)).await;

        view.lifecycle.cancel();
        tokio::time::sleep(Duration::from_secs(90)).await;

        assert_eq!(view.calls.load(Ordering::SeqCst), 1);
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_leaves_view_mounted() {
        let view = Arc::new(Counter::default());
        let handle = Poller::new(Duration::from_secs(30)).mount(view.clone());
        tokio::time::sleep(Duration::from_secs(1)).await;

        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(view.calls.load(Ordering::SeqCst), 1);
        assert!(!view.lifecycle.is_cancelled());
    }
}
