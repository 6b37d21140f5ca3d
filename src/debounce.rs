use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Collapses bursts of calls into one: only the last call scheduled within
/// the quiescence window runs.
///
/// Every `schedule` gets a fresh sequence number, handed to the task when it
/// fires. Once fired, the task runs to completion on its own; only tasks still
/// waiting out the window can be cancelled.
#[derive(Debug)]
pub struct Debouncer {
    wait: Duration,
    last_sequence: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            last_sequence: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Sequence number of the most recent `schedule` call (0 if none).
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::SeqCst)
    }

    /// Schedule `task` to run after the window, discarding any call still pending.
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, task: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let sequence = self.last_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let wait = self.wait;

        let mut pending = self.pending.lock();
        if let Some(timer) = pending.take() {
            timer.abort();
        }

        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            // Detach so a later `cancel_pending` cannot abort a request in flight.
            tokio::spawn(task(sequence));
        }));

        sequence
    }

    /// Drop the pending call, if it has not fired yet. Returns true if one was pending.
    pub fn cancel_pending(&self) -> bool {
        match self.pending.lock().take() {
            Some(timer) if !timer.is_finished() => {
                timer.abort();
                true
            }
            _ => false,
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.get_mut().take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last_call() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let fired = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..5 {
            let fired = fired.clone();
            debouncer.schedule(move |seq| async move {
                fired.lock().push(seq);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(*fired.lock(), vec![5]);
        assert_eq!(debouncer.last_sequence(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_outside_window_each_fire() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let count = count.clone();
            debouncer.schedule(move |_| async move {
                count.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(700)).await;
        }

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        debouncer.schedule(move |_| async move {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.cancel_pending());
        assert!(!debouncer.cancel_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_task_survives_cancel() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let done = Arc::new(AtomicUsize::new(0));

        let d = done.clone();
        debouncer.schedule(move |_| async move {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            d.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!debouncer.cancel_pending());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
