use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELED: u8 = 2;

/// Deadline enforcement for recognition sessions
pub struct SessionTimer;

impl SessionTimer {
    /// Arm a watchdog that calls `on_fire` once `deadline` elapses
    ///
    /// Resolves exactly once: either it fires, or `Watchdog::cancel` (or drop)
    /// wins and `on_fire` is never called. Tasks woken at the deadline instant
    /// run before the watchdog decides, so a cancel made in that tick wins.
    pub fn watchdog_for<F>(deadline: Duration, on_fire: F) -> Watchdog
    where
        F: FnOnce() + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(PENDING));

        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            tokio::task::yield_now().await;
            if task_state
                .compare_exchange(PENDING, FIRED, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                warn!("Session deadline of {:?} elapsed, forcing stop", deadline);
                on_fire();
            }
        });

        Watchdog {
            state,
            task: Some(task),
        }
    }
}

/// Armed session deadline
pub struct Watchdog {
    state: Arc<AtomicU8>,
    task: Option<JoinHandle<()>>,
}

impl Watchdog {
    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::SeqCst) == FIRED
    }

    /// Disarm the watchdog; returns true if it had already fired
    pub fn cancel(mut self) -> bool {
        self.disarm()
    }

    fn disarm(&mut self) -> bool {
        let fired = match self
            .state
            .compare_exchange(PENDING, CANCELED, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                if let Some(task) = self.task.take() {
                    task.abort();
                }
                debug!("Watchdog canceled before deadline");
                false
            }
            Err(state) => state == FIRED,
        };
        self.task = None;
        fired
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.disarm();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook = {
            let count = Arc::clone(&count);
            move || {
                count.fetch_add(1, Ordering::SeqCst);
            }
        };
        (count, hook)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_deadline() {
        let (count, hook) = counter();
        let watchdog = SessionTimer::watchdog_for(Duration::from_secs(300), hook);

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(!watchdog.has_fired());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(watchdog.has_fired());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(watchdog.cancel());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_deadline_never_fires() {
        let (count, hook) = counter();
        let watchdog = SessionTimer::watchdog_for(Duration::from_secs(10), hook);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!watchdog.cancel());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_at_deadline_instant_wins() {
        let (count, hook) = counter();
        let watchdog = SessionTimer::watchdog_for(Duration::from_secs(10), hook);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!watchdog.cancel());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_disarms() {
        let (count, hook) = counter();
        drop(SessionTimer::watchdog_for(Duration::from_secs(1), hook));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
