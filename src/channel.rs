//! Size pool backed by a bounded channel

use crate::cancel::CancelToken;
use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::pool::{self, Hooks, SizePool};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError, select};
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Size pool whose idle items sit in a bounded channel
///
/// The channel holds at most `capacity` items. Waiting for an item is a single
/// `select!` over "item ready", "pool closed" and a deadline, so no polling is
/// involved.
///
/// Once [`close`](ChannelPool::close) is called every operation fails with
/// [`PoolError::Closed`].
///
/// # Examples
///
/// ```
/// use sizepool::{ChannelPool, PoolError, SizePool};
/// use std::time::Duration;
///
/// let pool = ChannelPool::new(1, || 0u16, |n: &mut u16| *n = 0);
/// let item = pool.b_get(Duration::from_millis(10)).unwrap();
///
/// // nothing left, so the wait runs out
/// assert_eq!(pool.b_get(Duration::from_millis(10)), Err(PoolError::Exhausted));
///
/// pool.put(item).unwrap();
/// pool.close();
/// assert_eq!(pool.get(), Err(PoolError::Closed));
/// ```
pub struct ChannelPool<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    // dropped on close, which wakes every waiter selecting on `closed_signal`
    close_trigger: Mutex<Option<Sender<()>>>,
    closed_signal: Receiver<()>,
    closed: AtomicBool,
    put_timeout: Option<Duration>,
    hooks: Hooks<T>,
    metrics: MetricsTracker,
    capacity: usize,
}

impl<T: Send + 'static> ChannelPool<T> {
    /// Build a pool of `size` items (zero or less means the default size)
    pub fn new<F, R>(size: i64, factory: F, reset: R) -> Self
    where
        F: Fn() -> T + Sync,
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        Self::with_config(PoolConfiguration::new().with_capacity(size), factory, reset)
    }

    /// Build a pool from a full configuration
    pub fn with_config<F, R>(config: PoolConfiguration<T>, factory: F, reset: R) -> Self
    where
        F: Fn() -> T + Sync,
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        let capacity = config.capacity;
        debug!("building {capacity} items for channel-backed pool");

        let (sender, receiver) = channel::bounded(capacity);
        pool::build_concurrently(capacity, &factory, |item| {
            // the channel has exactly `capacity` slots, so this never blocks
            let _ = sender.send(item);
        });
        info!("channel-backed pool ready with {} items", receiver.len());

        let (close_trigger, closed_signal) = channel::bounded(0);
        Self {
            sender,
            receiver,
            close_trigger: Mutex::new(Some(close_trigger)),
            closed_signal,
            closed: AtomicBool::new(false),
            put_timeout: config.put_timeout,
            hooks: Hooks::new(reset, &config),
            metrics: MetricsTracker::new(),
            capacity,
        }
    }

    /// Wait up to `timeout` for an item.
    ///
    /// Fails with [`PoolError::Exhausted`] when the time runs out and with
    /// [`PoolError::Closed`] if the pool is closed before or during the wait.
    pub fn b_get(&self, timeout: Duration) -> PoolResult<T> {
        self.wait(timeout, &channel::never())
    }

    /// Like [`b_get`](Self::b_get), but also returns [`PoolError::Cancelled`]
    /// as soon as `token` fires.
    pub fn b_get_until(&self, timeout: Duration, token: &CancelToken) -> PoolResult<T> {
        if token.is_cancelled() {
            return Err(PoolError::Cancelled);
        }
        self.wait(timeout, token.signal())
    }

    /// Close the pool, release all waiters and drop the idle items.
    ///
    /// Calling it more than once has no further effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(self.close_trigger.lock().take());

        let drained = self.drain();
        info!("channel-backed pool closed, dropped {drained} idle items");
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn wait(&self, timeout: Duration, cancel: &Receiver<()>) -> PoolResult<T> {
        self.ensure_open()?;

        let deadline = channel::after(timeout);
        let result = select! {
            recv(self.receiver) -> item => item.map_err(|_| PoolError::Closed),
            recv(self.closed_signal) -> _ => Err(PoolError::Closed),
            recv(cancel) -> _ => Err(PoolError::Cancelled),
            recv(deadline) -> _ => Err(PoolError::Exhausted),
        }
        .and_then(|item| self.accept_received(item));

        match &result {
            Ok(_) => MetricsTracker::record(&self.metrics.total_retrieved),
            Err(PoolError::Exhausted) => {
                MetricsTracker::record(&self.metrics.exhausted_events);
                trace!("channel-backed pool exhausted after waiting {timeout:?}");
            }
            Err(_) => {}
        }
        result
    }

    /// Refuse an item that was still in the channel when the pool closed
    fn accept_received(&self, item: T) -> PoolResult<T> {
        if self.is_closed() {
            drop(item);
            self.drain();
            return Err(PoolError::Closed);
        }
        Ok(item)
    }

    /// Send `item`, waiting at most `timeout` for room. A close during the
    /// wait ends it with `Closed`.
    fn send_within(&self, item: T, timeout: Duration) -> PoolResult<()> {
        let deadline = channel::after(timeout);
        select! {
            send(self.sender, item) -> sent => sent.map_err(|_| PoolError::Closed),
            recv(self.closed_signal) -> _ => Err(PoolError::Closed),
            recv(deadline) -> _ => Err(PoolError::Timeout(timeout)),
        }
    }

    fn drain(&self) -> usize {
        self.receiver.try_iter().count()
    }

    fn ensure_open(&self) -> PoolResult<()> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }
        Ok(())
    }

    fn reject(&self, err: PoolError) -> PoolResult<()> {
        MetricsTracker::record(&self.metrics.rejected_returns);
        warn!("channel-backed pool refused a returned item: {err}");
        Err(err)
    }
}

impl<T: Send + 'static> SizePool<T> for ChannelPool<T> {
    fn init_size(&self) -> usize {
        self.capacity
    }

    fn get(&self) -> PoolResult<T> {
        self.ensure_open()?;

        match self.receiver.try_recv() {
            Ok(item) => {
                let item = self.accept_received(item)?;
                MetricsTracker::record(&self.metrics.total_retrieved);
                Ok(item)
            }
            Err(TryRecvError::Empty) => {
                MetricsTracker::record(&self.metrics.exhausted_events);
                trace!("channel-backed pool exhausted");
                Err(PoolError::Exhausted)
            }
            Err(TryRecvError::Disconnected) => Err(PoolError::Closed),
        }
    }

    /// Reset `item` and send it back into the channel.
    ///
    /// A full channel either rejects the item at once with
    /// [`PoolError::Full`] or, when a put timeout is configured, waits that
    /// long before failing with [`PoolError::Timeout`]. Closing the pool while
    /// a put is waiting ends it with [`PoolError::Closed`]. A rejected item is
    /// dropped.
    fn put(&self, mut item: T) -> PoolResult<()> {
        if self.is_closed() {
            return self.reject(PoolError::Closed);
        }
        self.hooks.recycle(&mut item, &self.metrics)?;

        let sent = match self.put_timeout {
            None => self.sender.try_send(item).map_err(|err| match err {
                TrySendError::Full(_) => PoolError::Full,
                TrySendError::Disconnected(_) => PoolError::Closed,
            }),
            Some(timeout) => self.send_within(item, timeout),
        };

        // a close that raced with the send must not leave the item behind
        let sent = sent.and_then(|()| {
            if self.is_closed() {
                self.drain();
                return Err(PoolError::Closed);
            }
            Ok(())
        });

        match sent {
            Ok(()) => {
                MetricsTracker::record(&self.metrics.total_returned);
                Ok(())
            }
            Err(err) => self.reject(err),
        }
    }

    fn available(&self) -> usize {
        self.receiver.len()
    }

    fn metrics(&self) -> PoolMetrics {
        if self.is_closed() {
            return self.metrics.closed_metrics(self.capacity);
        }
        self.metrics.get_metrics(self.receiver.len(), self.capacity)
    }
}
