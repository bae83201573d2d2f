//! Pool configuration options

use std::time::Duration;

/// Capacity used when a non-positive size is requested
pub const DEFAULT_POOL_SIZE: usize = 1024;

/// Configuration shared by every pool variant
///
/// # Examples
///
/// ```
/// use sizepool::{PoolConfiguration, DEFAULT_POOL_SIZE};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::<i32>::new()
///     .with_capacity(64)
///     .with_put_timeout(Duration::from_millis(5));
///
/// assert_eq!(config.capacity, 64);
/// assert_eq!(config.put_timeout, Some(Duration::from_millis(5)));
///
/// let fallback = PoolConfiguration::<i32>::new().with_capacity(0);
/// assert_eq!(fallback.capacity, DEFAULT_POOL_SIZE);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfiguration<T> {
    /// Number of resources built at construction, never changes afterwards
    pub capacity: usize,

    /// Predicate a returned item must satisfy to re-enter the store
    pub validation_function: Option<fn(&T) -> bool>,

    /// How long a channel-backed `put` may wait for room.
    /// `None` means a saturated store rejects the item immediately.
    pub put_timeout: Option<Duration>,
}

impl<T> Default for PoolConfiguration<T> {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_SIZE,
            validation_function: None,
            put_timeout: None,
        }
    }
}

impl<T> PoolConfiguration<T> {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool capacity. Zero or negative sizes fall back to
    /// [`DEFAULT_POOL_SIZE`].
    pub fn with_capacity(mut self, size: i64) -> Self {
        self.capacity = normalize_capacity(size);
        self
    }

    /// Discard returned items that fail `func` instead of pooling them
    pub fn with_validation(mut self, func: fn(&T) -> bool) -> Self {
        self.validation_function = Some(func);
        self
    }

    /// Let channel-backed puts block up to `timeout` on a full store
    pub fn with_put_timeout(mut self, timeout: Duration) -> Self {
        self.put_timeout = Some(timeout);
        self
    }
}

pub(crate) fn normalize_capacity(size: i64) -> usize {
    if size <= 0 {
        DEFAULT_POOL_SIZE
    } else {
        usize::try_from(size).unwrap_or(DEFAULT_POOL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_capacity_uses_default() {
        assert_eq!(normalize_capacity(0), DEFAULT_POOL_SIZE);
        assert_eq!(normalize_capacity(-7), DEFAULT_POOL_SIZE);
        assert_eq!(normalize_capacity(3), 3);
    }

    #[test]
    fn test_builder() {
        let config = PoolConfiguration::<u8>::new()
            .with_capacity(8)
            .with_validation(|b| *b != 0);

        assert_eq!(config.capacity, 8);
        assert!(config.put_timeout.is_none());
        let validate = config.validation_function.unwrap();
        assert!(validate(&1));
        assert!(!validate(&0));
    }
}
