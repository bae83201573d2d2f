//! Size pool backed by a lock-free FIFO queue

use crate::cancel::CancelToken;
use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::pool::{self, Hooks, SizePool};

use crossbeam::queue::SegQueue;
use log::{debug, info, trace};
use std::time::Duration;

/// Size pool that delegates storage to a [`SegQueue`]
///
/// The queue synchronizes itself; the pool adds no lock of its own. `pop`
/// checks for emptiness and removes in one step.
///
/// # Examples
///
/// ```
/// use sizepool::{QueuePool, SizePool};
///
/// let pool = QueuePool::new(4, Vec::<u8>::new, |buf: &mut Vec<u8>| buf.clear());
///
/// let mut buf = pool.get().unwrap();
/// buf.extend_from_slice(b"payload");
/// pool.put(buf).unwrap();
///
/// assert_eq!(pool.available(), 4);
/// ```
pub struct QueuePool<T> {
    items: SegQueue<T>,
    hooks: Hooks<T>,
    metrics: MetricsTracker,
    capacity: usize,
}

impl<T: Send + 'static> QueuePool<T> {
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
        debug!("building {capacity} items for queue-backed pool");

        let items = SegQueue::new();
        pool::build_concurrently(capacity, &factory, |item| items.push(item));
        info!("queue-backed pool ready with {} items", items.len());

        Self {
            items,
            hooks: Hooks::new(reset, &config),
            metrics: MetricsTracker::new(),
            capacity,
        }
    }

    /// Wait for an item, retrying every `interval`. Never gives up.
    pub fn b_get(&self, interval: Duration) -> T {
        pool::poll(interval, || self.take())
    }

    /// Wait for an item, retrying every `interval`, until `token` is cancelled
    pub fn b_get_until(&self, interval: Duration, token: &CancelToken) -> PoolResult<T> {
        pool::poll_until(interval, token, || self.take())
    }

    /// Async version of [`b_get`](Self::b_get); stops when the future is dropped
    pub async fn b_get_async(&self, interval: Duration) -> T {
        pool::poll_async(interval, || self.take()).await
    }

    fn take(&self) -> Option<T> {
        let item = self.items.pop();
        if item.is_some() {
            MetricsTracker::record(&self.metrics.total_retrieved);
        }
        item
    }
}

impl<T: Send + 'static> SizePool<T> for QueuePool<T> {
    fn init_size(&self) -> usize {
        self.capacity
    }

    fn get(&self) -> PoolResult<T> {
        self.take().ok_or_else(|| {
            MetricsTracker::record(&self.metrics.exhausted_events);
            trace!("queue-backed pool exhausted");
            PoolError::Exhausted
        })
    }

    fn put(&self, mut item: T) -> PoolResult<()> {
        self.hooks.recycle(&mut item, &self.metrics)?;
        self.items.push(item);
        MetricsTracker::record(&self.metrics.total_returned);
        Ok(())
    }

    fn available(&self) -> usize {
        self.items.len()
    }

    fn metrics(&self) -> PoolMetrics {
        self.metrics.get_metrics(self.items.len(), self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Debug, Default)]
    struct Buffer {
        bytes: Vec<u8>,
        reused: bool,
    }

    fn reset(buf: &mut Buffer) {
        buf.bytes.clear();
        buf.reused = true;
    }

    #[test]
    fn test_default_capacity() {
        let pool = QueuePool::new(-1, Buffer::default, reset);
        assert_eq!(pool.init_size(), crate::DEFAULT_POOL_SIZE);
        assert_eq!(pool.available(), crate::DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_round_trip_resets() {
        let pool = QueuePool::new(1, Buffer::default, reset);
        let mut buf = pool.get().unwrap();
        assert!(!buf.reused);
        buf.bytes.push(1);

        pool.put(buf).unwrap();
        let buf = pool.get().unwrap();
        assert!(buf.reused);
        assert!(buf.bytes.is_empty());
    }

    #[test]
    fn test_racing_for_last_item() {
        let pool = Arc::new(QueuePool::new(1, Buffer::default, reset));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || pool.get().is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_concurrent_gets_are_distinct() {
        let next = AtomicUsize::new(0);
        let pool = Arc::new(QueuePool::new(64, move || next.fetch_add(1, Ordering::SeqCst), |_| {}));
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || pool.get().unwrap())
            })
            .collect();

        let ids: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 64);
        assert_eq!(pool.get(), Err(PoolError::Exhausted));
    }

    #[tokio::test]
    async fn test_b_get_async_receives_put() {
        let pool = Arc::new(QueuePool::new(1, Buffer::default, reset));
        let held = pool.get().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.b_get_async(Duration::from_millis(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.put(held).unwrap();
        let buf = waiter.await.unwrap();
        assert!(buf.reused);
    }
}
