//! Background revalidation
//!
//! Runs a refresh job on a fixed interval in a tokio task until the owning
//! [`RefreshHandle`] is shut down or dropped.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Configuration for the refresh schedule
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between runs; zero disables the recurring schedule
    pub interval: Duration,
    /// Run the job once as soon as the task starts
    pub run_immediately: bool,
}

impl RefreshConfig {
    /// Whether the job repeats
    pub fn is_recurring(&self) -> bool {
        !self.interval.is_zero()
    }
}

/// Handle for controlling the background refresh task
#[derive(Debug)]
pub struct RefreshHandle {
    /// Dropping the sender also stops the task
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Spawns the refresh task
    ///
    /// No task is spawned when the job neither runs immediately nor recurs.
    /// Must be called from within a tokio runtime otherwise.
    pub fn spawn<F, Fut>(config: RefreshConfig, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if !config.run_immediately && !config.is_recurring() {
            return Self {
                shutdown_tx,
                task: None,
            };
        }

        let task = tokio::spawn(async move {
            if config.run_immediately {
                job().await;
            }
            if !config.is_recurring() {
                return;
            }

            let mut interval = tokio::time::interval(config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the first tick (immediate)
            interval.tick().await;

            loop {
                tokio::select! {
                    biased;
                    // Also resolves once the handle is dropped
                    _ = shutdown_rx.recv() => {
                        debug!("refresh task stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        job().await;
                    }
                }
            }
        });

        Self {
            shutdown_tx,
            task: Some(task),
        }
    }

    /// Stops the task, letting an in-flight run finish first
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_job(counter: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<()> {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[test]
    fn test_zero_interval_is_not_recurring() {
        let config = RefreshConfig {
            interval: Duration::ZERO,
            run_immediately: true,
        };
        assert!(!config.is_recurring());
    }

    #[tokio::test]
    async fn test_refresh_handle_spawn_disabled() {
        let counter = Arc::new(AtomicUsize::new(0));
        let config = RefreshConfig {
            interval: Duration::ZERO,
            run_immediately: false,
        };

        let handle = RefreshHandle::spawn(config, counting_job(&counter));

        assert!(handle.task.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_every_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let config = RefreshConfig {
            interval: Duration::from_millis(500),
            run_immediately: false,
        };

        let _handle = RefreshHandle::spawn(config, counting_job(&counter));
        tokio::time::sleep(Duration::from_millis(1001)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_immediately_adds_one_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let config = RefreshConfig {
            interval: Duration::from_millis(500),
            run_immediately: true,
        };

        let _handle = RefreshHandle::spawn(config, counting_job(&counter));
        tokio::time::sleep(Duration::from_millis(1001)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_run_without_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let config = RefreshConfig {
            interval: Duration::ZERO,
            run_immediately: true,
        };

        let _handle = RefreshHandle::spawn(config, counting_job(&counter));
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_runs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let config = RefreshConfig {
            interval: Duration::from_millis(500),
            run_immediately: false,
        };

        let handle = RefreshHandle::spawn(config, counting_job(&counter));
        tokio::time::sleep(Duration::from_millis(600)).await;
        handle.shutdown().await;
        tokio::time::sleep(Duration::from_millis(2000)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_with_a_tick_due_runs_nothing_more() {
        let counter = Arc::new(AtomicUsize::new(0));
        let slot: Arc<std::sync::Mutex<Option<RefreshHandle>>> = Arc::default();
        let config = RefreshConfig {
            interval: Duration::from_millis(500),
            run_immediately: false,
        };

        // The first run drops the handle, then outlasts the next tick
        let job_counter = Arc::clone(&counter);
        let job_slot = Arc::clone(&slot);
        let handle = RefreshHandle::spawn(config, move || {
            job_counter.fetch_add(1, Ordering::SeqCst);
            let handle = job_slot.lock().unwrap().take();
            async move {
                drop(handle);
                tokio::time::sleep(Duration::from_millis(600)).await;
            }
        });
        *slot.lock().unwrap() = Some(handle);
        tokio::time::sleep(Duration::from_millis(3000)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_runs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let config = RefreshConfig {
            interval: Duration::from_millis(500),
            run_immediately: false,
        };

        let handle = RefreshHandle::spawn(config, counting_job(&counter));
        drop(handle);
        tokio::time::sleep(Duration::from_millis(2000)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
