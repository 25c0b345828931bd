//! Trailing-edge debounce for async work.
//!
//! Each `schedule` starts a timer. Scheduling again before the timer fires
//! cancels the earlier timer, so only the last call in a burst runs. Work
//! whose timer already fired is never cancelled; it runs to completion even
//! if newer work is scheduled behind it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

const WAITING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

struct Scheduled {
    handle: JoinHandle<()>,
    state: Arc<AtomicU8>,
}

/// Held by every spawned task; dropping it (on completion or abort) marks
/// the task as no longer live.
struct LiveGuard(Arc<watch::Sender<usize>>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.send_modify(|live| *live -= 1);
    }
}

pub struct Debouncer {
    window: Duration,
    tasks: Mutex<Vec<Scheduled>>,
    /// Number of spawned tasks not yet finished or dropped
    live: Arc<watch::Sender<usize>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        let (live, _) = watch::channel(0);
        Self {
            window,
            tasks: Mutex::new(Vec::new()),
            live: Arc::new(live),
        }
    }

    /// Run `work` once the window passes without another call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, work: BoxFuture<'static, ()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());

        // Count the new task before cancelling the old one so `settled`
        // never sees a momentary zero
        self.live.send_modify(|live| *live += 1);
        let guard = LiveGuard(Arc::clone(&self.live));

        tasks.retain(|task| !task.handle.is_finished());
        tasks.retain(|task| {
            let superseded = task
                .state
                .compare_exchange(WAITING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
            if superseded {
                debug!("Debounced call superseded");
                task.handle.abort();
            }
            !superseded
        });

        let state = Arc::new(AtomicU8::new(WAITING));
        let timer_state = Arc::clone(&state);
        let window = self.window;
        let handle = tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(window).await;
            if timer_state
                .compare_exchange(WAITING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            work.await;
        });

        tasks.push(Scheduled { handle, state });
    }

    /// Wait until every scheduled call has either run or been superseded.
    ///
    /// Scheduled calls stay cancellable while this waits, so a burst that
    /// straddles a `settled` still collapses into one run.
    pub async fn settled(&self) {
        let mut live = self.live.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = live.wait_for(|count| *count == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;

    /// Each run adds 100 plus its own tag, so the total says which ran
    fn counting(counter: &Arc<AtomicUsize>, value: usize) -> BoxFuture<'static, ()> {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(100 + value, Ordering::SeqCst);
        }
        .boxed()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_only_last() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let counter = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting(&counter, 1));
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.schedule(counting(&counter, 2));
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.schedule(counting(&counter, 3));

        debouncer.settled().await;
        // Only the third call ran, exactly once
        assert_eq!(counter.load(Ordering::SeqCst), 103);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_while_settling_still_supersedes() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(300)));
        let runs = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting(&runs, 1));
        let waiter = {
            let debouncer = Arc::clone(&debouncer);
            tokio::spawn(async move { debouncer.settled().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.schedule(counting(&runs, 2));
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.schedule(counting(&runs, 3));

        waiter.await.unwrap();
        // Only the third call ran, exactly once
        assert_eq!(runs.load(Ordering::SeqCst), 103);
    }

    #[tokio::test]
    async fn test_settled_with_nothing_scheduled() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.settled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_runs_before_window() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let counter = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting(&counter, 1));
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        debouncer.settled().await;
        assert_eq!(counter.load(Ordering::SeqCst), 101);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_outside_window_both_run() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let runs = Arc::clone(&runs);
            debouncer.schedule(
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                }
                .boxed(),
            );
            tokio::time::sleep(Duration::from_millis(400)).await;
        }

        debouncer.settled().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_work_is_not_cancelled() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let finished = Arc::new(AtomicUsize::new(0));

        let slow = {
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        };
        debouncer.schedule(slow);

        // First timer has fired and its work is in flight
        tokio::time::sleep(Duration::from_millis(500)).await;
        let fast = {
            let finished = Arc::clone(&finished);
            async move {
                finished.fetch_add(10, Ordering::SeqCst);
            }
            .boxed()
        };
        debouncer.schedule(fast);

        debouncer.settled().await;
        assert_eq!(finished.load(Ordering::SeqCst), 11);
    }
}
