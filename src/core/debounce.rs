//! Trailing-edge debounce for high-frequency editor input
//!
//! A burst of values pushed closer together than the quiescence window is
//! committed once, with the last value, one window after the last push.
//! Dropping the [`Debouncer`] discards whatever is still pending.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Quiescence window used by the editor
pub const DEFAULT_QUIESCENCE: Duration = Duration::from_millis(300);

type CommitFn<T> = dyn Fn(T) + Send + Sync;

/// Value waiting for its window to elapse
struct Slot<T> {
    /// Incremented on every push and cancel
    generation: u64,
    value: Option<T>,
}

impl<T> Slot<T> {
    /// Take the value if it still belongs to `generation`
    fn take_if(&mut self, generation: u64) -> Option<T> {
        if self.generation == generation {
            self.value.take()
        } else {
            None
        }
    }
}

/// Coalesces pushed values and commits the last one after a quiet period
pub struct Debouncer<T: Send + 'static> {
    runtime: Handle,
    quiescence: Duration,
    commit: Arc<CommitFn<T>>,
    slot: Arc<Mutex<Slot<T>>>,
    task: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer that schedules its timers on `runtime`
    pub fn new(runtime: Handle, quiescence: Duration, commit: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            runtime,
            quiescence,
            commit: Arc::new(commit),
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                value: None,
            })),
            task: None,
        }
    }

    /// Schedule `value`, replacing anything still pending
    pub fn push(&mut self, value: T) {
        self.abort_task();

        let generation = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.generation += 1;
            slot.value = Some(value);
            slot.generation
        };

        let slot = Arc::clone(&self.slot);
        let commit = Arc::clone(&self.commit);
        let delay = self.quiescence;
        self.task = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Held through the commit so a concurrent flush waits for it
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = slot.take_if(generation) {
                commit(value);
            }
        }));
    }

    /// Discard the pending value, if any. Returns whether one was discarded.
    pub fn cancel(&mut self) -> bool {
        self.abort_task();
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.value.take().is_some()
    }

    /// Commit the pending value now instead of waiting for the window.
    /// Returns whether anything was committed.
    ///
    /// A timer commit already in progress finishes before this returns.
    pub fn flush(&mut self) -> bool {
        self.abort_task();
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        match slot.value.take() {
            Some(value) => {
                (self.commit)(value);
                true
            }
            None => false,
        }
    }

    /// Whether a value is waiting to be committed
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .is_some()
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if self.cancel() {
            tracing::debug!("Discarded pending debounced update on teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Instant};

    type Commits = Arc<Mutex<Vec<(Duration, &'static str)>>>;

    fn recorder(start: Instant) -> (Commits, impl Fn(&'static str) + Send + Sync + 'static) {
        let commits: Commits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&commits);
        let commit = move |value: &'static str| {
            sink.lock().unwrap().push((start.elapsed(), value));
        };
        (commits, commit)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_commits_last_value_once() {
        let start = Instant::now();
        let (commits, commit) = recorder(start);
        let mut debouncer = Debouncer::new(Handle::current(), ms(300), commit);

        debouncer.push("A");
        sleep(ms(50)).await;
        debouncer.push("B");
        sleep(ms(50)).await;
        debouncer.push("C");
        sleep(ms(250)).await;
        debouncer.push("D");
        assert!(debouncer.is_pending());

        sleep(ms(299)).await;
        assert!(commits.lock().unwrap().is_empty());

        sleep(ms(1000)).await;
        assert_eq!(*commits.lock().unwrap(), vec![(ms(650), "D")]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_discards_pending_value() {
        let start = Instant::now();
        let (commits, commit) = recorder(start);
        let mut debouncer = Debouncer::new(Handle::current(), ms(300), commit);

        debouncer.push("A");
        sleep(ms(50)).await;
        debouncer.push("B");
        sleep(ms(50)).await;
        debouncer.push("C");
        sleep(ms(100)).await;

        drop(debouncer);
        sleep(ms(2000)).await;

        assert!(commits.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_commit_separately() {
        let start = Instant::now();
        let (commits, commit) = recorder(start);
        let mut debouncer = Debouncer::new(Handle::current(), ms(300), commit);

        debouncer.push("first");
        sleep(ms(400)).await;
        debouncer.push("second");
        sleep(ms(400)).await;

        assert_eq!(
            *commits.lock().unwrap(),
            vec![(ms(300), "first"), (ms(700), "second")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_commits_immediately() {
        let start = Instant::now();
        let (commits, commit) = recorder(start);
        let mut debouncer = Debouncer::new(Handle::current(), ms(300), commit);

        debouncer.push("typed");
        sleep(ms(10)).await;
        assert!(debouncer.flush());
        assert!(!debouncer.flush());

        sleep(ms(1000)).await;
        assert_eq!(*commits.lock().unwrap(), vec![(ms(10), "typed")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_debouncer_usable() {
        let start = Instant::now();
        let (commits, commit) = recorder(start);
        let mut debouncer = Debouncer::new(Handle::current(), DEFAULT_QUIESCENCE, commit);

        debouncer.push("dropped");
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        debouncer.push("kept");
        sleep(ms(1000)).await;

        assert_eq!(*commits.lock().unwrap(), vec![(ms(300), "kept")]);
    }

    #[test]
    fn test_flush_waits_for_commit_in_progress() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .unwrap();
        let committed = Arc::new(Mutex::new(Vec::new()));
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let sink = Arc::clone(&committed);
        let mut debouncer = Debouncer::new(runtime.handle().clone(), ms(10), move |value: &'static str| {
            let _ = started_tx.send(());
            std::thread::sleep(ms(100));
            sink.lock().unwrap().push(value);
        });

        debouncer.push("typed");
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // The timer already took the value; flush must not return before it lands
        assert!(!debouncer.flush());
        assert_eq!(*committed.lock().unwrap(), vec!["typed"]);
        assert!(!debouncer.is_pending());
    }
}
