//! Periodic background tasks
//!
//! A named OS thread runs a closure on every tick until it is stopped. The
//! closure is isolated with `catch_unwind`: a panicking tick is logged and
//! the loop keeps going.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, select, tick, Sender};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::error::Result;

struct Running {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

/// Handle to a running periodic task
pub(crate) struct Ticker {
    name: String,
    running: Mutex<Option<Running>>,
}

impl Ticker {
    /// Start a thread called `name` that calls `task` every `interval`
    pub(crate) fn spawn<F>(name: impl Into<String>, interval: Duration, mut task: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let (shutdown, shutdown_rx) = bounded::<()>(0);
        let ticks = tick(interval);

        let thread_name = name.clone();
        let thread = thread::Builder::new().name(name.clone()).spawn(move || {
            loop {
                select! {
                    recv(ticks) -> _ => {
                        if panic::catch_unwind(AssertUnwindSafe(&mut task)).is_err() {
                            error!(task = %thread_name, "periodic task panicked");
                        }
                    }
                    recv(shutdown_rx) -> _ => break,
                }
            }
            debug!(task = %thread_name, "periodic task stopped");
        })?;

        Ok(Self {
            name,
            running: Mutex::new(Some(Running { shutdown, thread })),
        })
    }

    /// Stop the loop and wait for the thread. Safe to call more than once.
    pub(crate) fn stop(&self) {
        let Some(Running { shutdown, thread }) = self.running.lock().take() else {
            return;
        };

        drop(shutdown);
        if thread.join().is_err() {
            error!(task = %self.name, "periodic task thread panicked");
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_ticker_runs_until_stopped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let ticker = Ticker::spawn("test-ticker", Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(60));
        ticker.stop();
        let after_stop = calls.load(Ordering::SeqCst);

        assert!(after_stop > 0);
        assert!(!ticker.is_running());

        thread::sleep(Duration::from_millis(30));
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_panicking_task_keeps_ticking() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let ticker = Ticker::spawn("test-panic", Duration::from_millis(5), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first tick fails");
            }
        })
        .unwrap();

        thread::sleep(Duration::from_millis(60));
        ticker.stop();

        assert!(calls.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let ticker = Ticker::spawn("test-stop", Duration::from_millis(5), || {}).unwrap();
        ticker.stop();
        ticker.stop();
        assert!(!ticker.is_running());
    }
}
