//! Shared pool contract and the machinery every backing store reuses

use crate::cancel::CancelToken;
use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::metrics::{MetricsTracker, PoolMetrics};

use crossbeam::channel::{select, tick};
use log::warn;
use std::thread;
use std::time::Duration;

/// Behaviour common to every size pool, whatever holds the idle items
///
/// Items are handed out by value, so a checked-out item is owned by exactly
/// one caller until it is given back with [`put`](SizePool::put).
pub trait SizePool<T>: Send + Sync {
    /// Capacity the pool was built with; never changes
    fn init_size(&self) -> usize;

    /// Take the oldest idle item without waiting.
    ///
    /// Fails with [`PoolError::Exhausted`] when nothing is idle.
    fn get(&self) -> PoolResult<T>;

    /// Reset `item` and make it available again.
    fn put(&self, item: T) -> PoolResult<()>;

    /// Number of idle items right now
    fn available(&self) -> usize;

    /// Snapshot of the pool counters
    fn metrics(&self) -> PoolMetrics;
}

/// Caller-supplied recycling steps applied on every `put`
pub(crate) struct Hooks<T> {
    reset: Box<dyn Fn(&mut T) + Send + Sync>,
    validate: Option<fn(&T) -> bool>,
}

impl<T> Hooks<T> {
    pub(crate) fn new<R>(reset: R, config: &PoolConfiguration<T>) -> Self
    where
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        Self {
            reset: Box::new(reset),
            validate: config.validation_function,
        }
    }

    /// Validate then reset `item`. Returns `ValidationFailed` when the item
    /// must not go back into the store.
    pub(crate) fn recycle(&self, item: &mut T, metrics: &MetricsTracker) -> PoolResult<()> {
        if let Some(validate) = self.validate
            && !validate(item)
        {
            MetricsTracker::record(&metrics.validation_failures);
            warn!("discarding returned item that failed validation");
            return Err(PoolError::ValidationFailed);
        }

        (self.reset)(item);
        Ok(())
    }
}

/// Run `factory` `capacity` times, each call on its own scoped thread, and
/// hand every result to `deliver`. Returns once all of them have finished.
///
/// A builder thread that cannot be spawned is replaced by a call on the
/// current thread, so `deliver` always sees exactly `capacity` items.
pub(crate) fn build_concurrently<T, F, D>(capacity: usize, factory: &F, deliver: D)
where
    T: Send,
    F: Fn() -> T + Sync,
    D: Fn(T) + Sync,
{
    let deliver = &deliver;
    thread::scope(|scope| {
        for slot in 0..capacity {
            let spawned = thread::Builder::new()
                .name(format!("sizepool-build-{slot}"))
                .spawn_scoped(scope, move || deliver(factory()));

            if let Err(err) = spawned {
                warn!("could not spawn builder thread ({err}), building slot {slot} inline");
                deliver(factory());
            }
        }
    });
}

/// Call `attempt` now and then on every tick of `interval` until it yields.
pub(crate) fn poll<T>(interval: Duration, mut attempt: impl FnMut() -> Option<T>) -> T {
    let ticker = tick(interval);
    loop {
        if let Some(item) = attempt() {
            return item;
        }
        let _ = ticker.recv();
    }
}

/// Like [`poll`], but gives up with `Cancelled` as soon as `token` fires.
pub(crate) fn poll_until<T>(
    interval: Duration,
    token: &CancelToken,
    mut attempt: impl FnMut() -> Option<T>,
) -> PoolResult<T> {
    let ticker = tick(interval);
    loop {
        if token.is_cancelled() {
            return Err(PoolError::Cancelled);
        }
        if let Some(item) = attempt() {
            return Ok(item);
        }
        select! {
            recv(token.signal()) -> _ => return Err(PoolError::Cancelled),
            recv(ticker) -> _ => {}
        }
    }
}

/// Async [`poll`] on a tokio interval. Dropping the future stops polling.
pub(crate) async fn poll_async<T>(interval: Duration, mut attempt: impl FnMut() -> Option<T>) -> T {
    let mut ticker = tokio::time::interval(interval);
    loop {
        // the first tick completes immediately
        ticker.tick().await;
        if let Some(item) = attempt() {
            return item;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, Mutex};

    #[test]
    fn test_build_concurrently_delivers_every_item() {
        let built = AtomicUsize::new(0);
        let collected = Mutex::new(Vec::new());

        build_concurrently(
            16,
            &|| built.fetch_add(1, Ordering::SeqCst),
            |id| collected.lock().unwrap().push(id),
        );

        let mut ids = collected.into_inner().unwrap();
        ids.sort_unstable();
        assert_eq!(ids, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_build_runs_factories_in_parallel() {
        // only returns once all 32 factory calls are running at the same time
        let barrier = Barrier::new(32);
        let leaders = AtomicUsize::new(0);

        build_concurrently(
            32,
            &|| barrier.wait().is_leader(),
            |leader| {
                if leader {
                    leaders.fetch_add(1, Ordering::SeqCst);
                }
            },
        );
        assert_eq!(leaders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_recycle_validates_before_reset() {
        let config = PoolConfiguration::<i32>::new().with_validation(|n| *n >= 0);
        let hooks = Hooks::new(|n: &mut i32| *n = 0, &config);
        let metrics = MetricsTracker::new();

        let mut good = 9;
        assert!(hooks.recycle(&mut good, &metrics).is_ok());
        assert_eq!(good, 0);

        let mut bad = -1;
        assert_eq!(hooks.recycle(&mut bad, &metrics), Err(PoolError::ValidationFailed));
        assert_eq!(bad, -1);
        assert_eq!(metrics.get_metrics(0, 1).validation_failures, 1);
    }

    #[test]
    fn test_poll_retries_until_ready() {
        let mut calls = 0;
        let value = poll(Duration::from_millis(1), || {
            calls += 1;
            (calls == 3).then_some(calls)
        });
        assert_eq!(value, 3);
    }

    #[test]
    fn test_poll_until_observes_cancel() {
        let token = CancelToken::new();
        let canceller = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                token.cancel();
            })
        };

        let result: PoolResult<()> = poll_until(Duration::from_secs(60), &token, || None);
        assert_eq!(result, Err(PoolError::Cancelled));
        canceller.join().unwrap();
    }

    #[tokio::test]
    async fn test_poll_async_first_attempt_is_immediate() {
        let value = tokio::time::timeout(
            Duration::from_secs(1),
            poll_async(Duration::from_secs(60), || Some(7)),
        )
        .await
        .unwrap();
        assert_eq!(value, 7);
    }
}
