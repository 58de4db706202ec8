//! Stops both listeners together.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long listeners get to drain in-flight requests.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token, then wait for every listener task to finish.
    ///
    /// Tasks still running when `timeout` elapses are aborted. Returns
    /// whether every task finished on its own.
    pub async fn graceful_shutdown(
        &self,
        handles: Vec<JoinHandle<()>>,
        timeout: Option<Duration>,
    ) -> bool {
        let timeout = timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);
        let deadline = Instant::now() + timeout;

        self.shutdown();
        info!(task_count = handles.len(), timeout_ms = timeout.as_millis() as u64, "draining listeners");

        let mut clean = true;
        for mut handle in handles {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "listener task failed");
                    clean = false;
                }
                Err(_) => {
                    warn!("listener did not drain in {timeout:?}, aborting");
                    handle.abort();
                    clean = false;
                }
            }
        }
        clean
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running() {
        let coord = ShutdownCoordinator::default();
        assert!(!coord.is_shutting_down());
    }

    #[test]
    fn shutdown_cancels_every_token() {
        let coord = ShutdownCoordinator::new();
        let a = coord.token();
        let b = coord.clone().token();
        coord.shutdown();
        coord.shutdown();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert!(coord.is_shutting_down());
    }

    #[tokio::test]
    async fn waits_for_cooperative_tasks() {
        let coord = ShutdownCoordinator::new();
        let handles = (0..2)
            .map(|_| {
                let token = coord.token();
                tokio::spawn(async move { token.cancelled().await })
            })
            .collect();

        assert!(coord.graceful_shutdown(handles, None).await);
    }

    #[tokio::test(start_paused = true)]
    async fn aborts_stuck_tasks_after_timeout() {
        let coord = ShutdownCoordinator::new();
        let stuck = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        let clean = coord
            .graceful_shutdown(vec![stuck], Some(Duration::from_millis(50)))
            .await;
        assert!(!clean);
    }

    #[tokio::test]
    async fn reports_panicked_task() {
        let coord = ShutdownCoordinator::new();
        let failing = tokio::spawn(async { panic!("listener crashed") });
        assert!(!coord.graceful_shutdown(vec![failing], None).await);
    }
}
