//! Size pool backed by a locked doubly-linked list

use crate::cancel::CancelToken;
use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::pool::{self, Hooks, SizePool};

use crossbeam::channel;
use log::{debug, info, trace};
use parking_lot::Mutex;
use std::collections::LinkedList;
use std::time::Duration;

/// Size pool whose idle items live in a [`LinkedList`] behind one lock
///
/// Items are taken from the front and returned to the back, so the item that
/// has been idle longest is handed out first.
///
/// # Examples
///
/// ```
/// use sizepool::{ListPool, PoolError, SizePool};
///
/// let pool = ListPool::new(2, String::new, |s: &mut String| s.clear());
/// assert_eq!(pool.init_size(), 2);
///
/// let mut first = pool.get().unwrap();
/// let _second = pool.get().unwrap();
/// assert_eq!(pool.get(), Err(PoolError::Exhausted));
///
/// first.push_str("dirty");
/// pool.put(first).unwrap();
/// assert_eq!(pool.get().unwrap(), "");
/// ```
pub struct ListPool<T> {
    items: Mutex<LinkedList<T>>,
    hooks: Hooks<T>,
    metrics: MetricsTracker,
    capacity: usize,
}

impl<T: Send + 'static> ListPool<T> {
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
        debug!("building {capacity} items for list-backed pool");

        // results are collected over a channel, the list itself is not shared
        let (sender, receiver) = channel::bounded(capacity);
        pool::build_concurrently(capacity, &factory, |item| {
            let _ = sender.send(item);
        });
        let items: LinkedList<T> = receiver.try_iter().collect();
        info!("list-backed pool ready with {} items", items.len());

        Self {
            items: Mutex::new(items),
            hooks: Hooks::new(reset, &config),
            metrics: MetricsTracker::new(),
            capacity,
        }
    }

    /// Wait for an item, retrying every `interval`.
    ///
    /// There is no upper bound on the wait: if nothing is ever put back, this
    /// never returns. Use [`b_get_until`](Self::b_get_until) or
    /// [`b_get_async`](Self::b_get_async) when the wait must be bounded.
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
        let item = self.items.lock().pop_front();
        if item.is_some() {
            MetricsTracker::record(&self.metrics.total_retrieved);
        }
        item
    }
}

impl<T: Send + 'static> SizePool<T> for ListPool<T> {
    fn init_size(&self) -> usize {
        self.capacity
    }

    fn get(&self) -> PoolResult<T> {
        self.take().ok_or_else(|| {
            MetricsTracker::record(&self.metrics.exhausted_events);
            trace!("list-backed pool exhausted");
            PoolError::Exhausted
        })
    }

    fn put(&self, mut item: T) -> PoolResult<()> {
        self.hooks.recycle(&mut item, &self.metrics)?;
        self.items.lock().push_back(item);
        MetricsTracker::record(&self.metrics.total_returned);
        Ok(())
    }

    fn available(&self) -> usize {
        self.items.lock().len()
    }

    fn metrics(&self) -> PoolMetrics {
        self.metrics.get_metrics(self.available(), self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn numbered(size: i64) -> ListPool<usize> {
        let next = AtomicUsize::new(0);
        ListPool::new(size, move || next.fetch_add(1, Ordering::SeqCst), |_| {})
    }

    #[test]
    fn test_new_pool_is_full() {
        let pool = numbered(8);
        assert_eq!(pool.init_size(), 8);
        assert_eq!(pool.available(), 8);
    }

    #[test]
    fn test_get_until_exhausted() {
        let pool = numbered(4);
        let mut seen: Vec<_> = (0..4).map(|_| pool.get().unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);

        assert_eq!(pool.get(), Err(PoolError::Exhausted));
        assert_eq!(pool.metrics().exhausted_events, 1);
    }

    #[test]
    fn test_put_appends_at_back() {
        let pool = ListPool::new(1, || 0u32, |n: &mut u32| *n += 100);
        pool.put(5).unwrap();
        assert_eq!(pool.available(), 2);

        assert_eq!(pool.get().unwrap(), 0);
        assert_eq!(pool.get().unwrap(), 105);
    }

    #[test]
    fn test_validation_drops_bad_items() {
        let config = PoolConfiguration::new()
            .with_capacity(1)
            .with_validation(|n: &i32| *n >= 0);
        let pool = ListPool::with_config(config, || 1, |_| {});

        assert_eq!(pool.put(-3), Err(PoolError::ValidationFailed));
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_b_get_waits_for_put() {
        let pool = Arc::new(numbered(1));
        let held = pool.get().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.b_get(Duration::from_millis(5)))
        };

        thread::sleep(Duration::from_millis(30));
        pool.put(held).unwrap();
        assert_eq!(waiter.join().unwrap(), 0);
    }

    #[test]
    fn test_b_get_until_cancelled() {
        let pool = numbered(1);
        let _held = pool.get().unwrap();
        let token = CancelToken::new();
        token.cancel();

        assert_eq!(
            pool.b_get_until(Duration::from_millis(5), &token),
            Err(PoolError::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_b_get_async_bounded_by_timeout() {
        let pool = numbered(1);
        let _held = pool.get().unwrap();

        let result =
            tokio::time::timeout(Duration::from_millis(30), pool.b_get_async(Duration::from_millis(5))).await;
        assert!(result.is_err());
    }
}
