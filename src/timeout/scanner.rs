//! Background thread that fires expired timeout tasks.

use super::queue::{TimeoutQueue, TimeoutTask};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Receiver of expired timeout tasks.
///
/// Implementors decide whether the task is still current and perform the
/// fallback. Called on the scanner thread, one task at a time.
pub trait TimeoutHandler<K>: Send + Sync {
    fn handle_timeout(&self, task: &TimeoutTask<K>);
}

/// Owned handle to a running scanner thread.
///
/// Stopping sets a flag, wakes the thread and joins it, so shutdown latency
/// is bounded by one scan interval. Dropping the handle stops the scanner.
pub struct TimeoutScanner {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TimeoutScanner {
    /// Spawn a scanner that drains `queue` every `interval` and passes each
    /// expired task to `handler`.
    pub fn spawn<K, H>(
        name: String,
        queue: Arc<TimeoutQueue<K>>,
        handler: Arc<H>,
        interval: Duration,
    ) -> io::Result<Self>
    where
        K: Send + 'static,
        H: TimeoutHandler<K> + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || scan_loop(&thread_stop, &queue, handler.as_ref(), interval))?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the thread to exit and wait for it.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stop.store(true, Ordering::Release);
        handle.thread().unpark();
        if handle.join().is_err() {
            error!("timeout scanner thread panicked");
        }
    }
}

impl Drop for TimeoutScanner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn scan_loop<K, H>(stop: &AtomicBool, queue: &TimeoutQueue<K>, handler: &H, interval: Duration)
where
    H: TimeoutHandler<K> + ?Sized,
{
    info!(interval_ms = interval.as_millis() as u64, "timeout scanner started");
    while !stop.load(Ordering::Acquire) {
        let wake_at = Instant::now() + interval;
        loop {
            if stop.load(Ordering::Acquire) {
                info!("timeout scanner stopped");
                return;
            }
            let now = Instant::now();
            if now >= wake_at {
                break;
            }
            thread::park_timeout(wake_at - now);
        }

        let expired = queue.drain_expired(Instant::now());
        if !expired.is_empty() {
            debug!(count = expired.len(), "draining expired timeout tasks");
        }
        for task in &expired {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle_timeout(task)));
            if let Err(payload) = outcome {
                error!(
                    panic = %panic_message(payload.as_ref()),
                    "timeout handler panicked; continuing scan"
                );
            }
        }
    }
    info!("timeout scanner stopped");
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
