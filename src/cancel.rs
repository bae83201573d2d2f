//! Cancellation for blocking acquisitions

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared signal that releases blocked `b_get_until` calls
///
/// Cancelling drops the internal sender, which disconnects the channel every
/// waiter is selecting on.
///
/// # Examples
///
/// ```
/// use sizepool::{CancelToken, ListPool, PoolError, SizePool};
/// use std::time::Duration;
///
/// let pool = ListPool::new(1, || 0u32, |n: &mut u32| *n = 0);
/// let _held = pool.get().unwrap();
///
/// let token = CancelToken::new();
/// token.cancel();
///
/// let result = pool.b_get_until(Duration::from_millis(5), &token);
/// assert_eq!(result, Err(PoolError::Cancelled));
/// ```
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
    cancelled: AtomicBool,
}

impl CancelToken {
    /// Create a token that has not fired yet
    pub fn new() -> Self {
        let (trigger, signal) = channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                trigger: Mutex::new(Some(trigger)),
                signal,
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// Fire the token. Calling it again has no effect.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        drop(self.inner.trigger.lock().take());
    }

    /// Whether [`cancel`](Self::cancel) has been called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once the token fires
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_signal_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            thread::spawn(move || token.signal().recv().is_err())
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(waiter.join().unwrap());
    }
}
