//! # Worker Supervision
//!
//! Background loops must never die: a panicking or erroring iteration
//! is logged and the worker relaunches after a delay.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

/// Delay before relaunching a failed worker.
pub const RESTART_DELAY_SECS: u64 = 60;

/// Run a worker factory forever. Each invocation of `factory` produces
/// one run of the worker body; a clean exit, an error, or a panic all
/// lead to a delayed relaunch.
pub fn spawn_supervised<F, Fut>(name: &'static str, mut factory: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            info!(worker = name, "worker starting");
            let run = tokio::spawn(factory());
            match run.await {
                Ok(Ok(())) => info!(worker = name, "worker exited, relaunching"),
                Ok(Err(e)) => error!(worker = name, error = %e, "worker failed, relaunching"),
                Err(join_err) if join_err.is_panic() => {
                    error!(worker = name, "worker panicked, relaunching")
                }
                Err(_) => info!(worker = name, "worker cancelled, relaunching"),
            }
            tokio::time::sleep(Duration::from_secs(RESTART_DELAY_SECS)).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_worker_relaunches_after_error_and_panic() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        let _handle = spawn_supervised("test-worker", move || {
            let counter = counter.clone();
            async move {
                match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => anyhow::bail!("simulated failure"),
                    1 => panic!("simulated panic"),
                    _ => {
                        // Park forever once stable.
                        std::future::pending::<()>().await;
                        Ok(())
                    }
                }
            }
        });

        // Two failures, then the third run parks.
        tokio::time::sleep(Duration::from_secs(RESTART_DELAY_SECS * 3)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
