use parking_lot::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Trailing-edge debouncer
///
/// Every call replaces the pending task; only the closure passed to the most
/// recent call runs, once `delay` has elapsed without another call.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    runtime: Handle,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration, runtime: Handle) -> Self {
        Self {
            delay,
            runtime,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `f`, superseding whatever was scheduled before
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock();
        if let Some(task) = pending.take() {
            task.abort();
        }

        let delay = self.delay;
        *pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        }));
    }

    /// Drop the pending closure, returning whether one was still waiting
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(task) => {
                let waiting = !task.is_finished();
                task.abort();
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_only_last_call_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(250), Handle::current());
        let last = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));

        for value in 1..=3 {
            let last = Arc::clone(&last);
            let runs = Arc::clone(&runs);
            debouncer.call(move || {
                last.store(value, Ordering::SeqCst);
                runs.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 3);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_call() {
        let debouncer = Debouncer::new(Duration::from_millis(250), Handle::current());
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        debouncer.call(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.is_pending());
        assert!(debouncer.cancel());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!debouncer.cancel());
    }
}
