//! # sizepool
//!
//! Fixed-size pools of reusable resources for Rust. A pool builds all of its
//! items up front, hands them out by value, and resets them when they come
//! back, so expensive objects such as connections are created once and reused.
//!
//! ## Features
//!
//! - Concurrent warm-up: every item is built on its own thread at construction
//! - Three interchangeable backing stores behind one [`SizePool`] trait:
//!   - [`ListPool`]: linked list behind a single lock
//!   - [`QueuePool`]: lock-free concurrent queue
//!   - [`ChannelPool`]: bounded channel with timed waits and `close`
//! - Non-blocking `get`, polling `b_get` and timeout-bound `b_get`
//! - Cancellable waits via [`CancelToken`] or async futures
//! - Optional validation of returned items
//! - Metrics with Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use sizepool::{ListPool, SizePool};
//!
//! struct Conn {
//!     addr: String,
//! }
//!
//! let pool = ListPool::new(
//!     8,
//!     || Conn { addr: String::new() },
//!     |c: &mut Conn| c.addr.clear(),
//! );
//!
//! let mut conn = pool.get().unwrap();
//! conn.addr.push_str("127.0.0.1:6379");
//! pool.put(conn).unwrap();
//! assert_eq!(pool.available(), 8);
//! ```

mod cancel;
mod channel;
mod config;
mod errors;
mod list;
mod metrics;
mod pool;
mod queue;

pub use cancel::CancelToken;
pub use channel::ChannelPool;
pub use config::{PoolConfiguration, DEFAULT_POOL_SIZE};
pub use errors::{PoolError, PoolResult};
pub use list::ListPool;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use metrics::PoolMetrics;
pub use pool::SizePool;
pub use queue::QueuePool;
