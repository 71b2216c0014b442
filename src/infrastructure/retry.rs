use std::future::Future;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

type TimerSlot = Mutex<Option<JoinHandle<()>>>;

/// One-shot timer that re-enters the subscribe cycle after a failure.
///
/// The timer holds a single slot: arming it replaces and aborts any prior
/// arm, so at most one wake-up is ever pending.
#[derive(Debug, Default)]
pub struct RetryTimer {
    slot: Arc<TimerSlot>,
}

impl RetryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `wakeup` to run once after `delay`, replacing any prior arm.
    pub fn start<F>(&self, delay: Duration, wakeup: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap();
        if let Some(handle) = slot.take() {
            handle.abort();
        }

        let slot_ref = Arc::downgrade(&self.slot);
        *slot = Some(tokio::spawn(async move {
            sleep(delay).await;

            // Self-disarm before re-entering the cycle.
            if let Some(slot) = slot_ref.upgrade() {
                slot.lock().unwrap().take();
            }
            tracing::debug!("retry timer fired, re-entering subscribe cycle");
            wakeup.await;
        }));
    }

    /// Cancels a pending wake-up. Safe to call whether armed or not.
    pub fn stop(&self) {
        if let Some(handle) = self.slot.lock().unwrap().take() {
            handle.abort();
            tracing::debug!("retry timer stopped");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }

    /// Detached handle that lets a status recipient cancel the pending retry.
    pub fn cancel_handle(&self) -> RetryCancel {
        RetryCancel {
            slot: Arc::downgrade(&self.slot),
        }
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// User-facing hook carried on retriable failure statuses.
///
/// Holds only a weak reference to the timer slot: cancelling after the
/// subscriber is gone is a no-op.
#[derive(Debug, Clone)]
pub struct RetryCancel {
    slot: Weak<TimerSlot>,
}

impl RetryCancel {
    pub fn cancel(&self) {
        if let Some(slot) = self.slot.upgrade()
            && let Some(handle) = slot.lock().unwrap().take()
        {
            handle.abort();
            tracing::debug!("scheduled retry cancelled by listener");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_start_fires_wakeup_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = RetryTimer::new();

        let counter = Arc::clone(&fired);
        timer.start(Duration::from_millis(10), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test]
    async fn test_restart_replaces_prior_arm() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = RetryTimer::new();

        for _ in 0..3 {
            let counter = Arc::clone(&fired);
            timer.start(Duration::from_millis(10), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = RetryTimer::new();

        let counter = Arc::clone(&fired);
        timer.start(Duration::from_millis(10), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.stop();
        timer.stop();
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_handle_disarms() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = RetryTimer::new();

        let counter = Arc::clone(&fired);
        timer.start(Duration::from_millis(10), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let handle = timer.cancel_handle();
        handle.cancel();
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_handle_outliving_timer_is_noop() {
        let timer = RetryTimer::new();
        timer.start(Duration::from_millis(10), async {});
        let handle = timer.cancel_handle();
        drop(timer);

        handle.cancel();
    }
}
