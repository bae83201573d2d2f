//! Basic usage examples for sizepool

use sizepool::{CancelToken, ChannelPool, ListPool, PoolConfiguration, QueuePool, SizePool};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
struct FakeConn {
    addr: String,
    timeout: Duration,
}

fn new_conn() -> FakeConn {
    // simulate an expensive connect
    thread::sleep(Duration::from_millis(30));
    FakeConn::default()
}

fn reset_conn(conn: &mut FakeConn) {
    conn.addr.clear();
    conn.timeout = Duration::ZERO;
}

fn main() {
    println!("=== sizepool - Basic Examples ===\n");

    // Example 1: Pre-warmed list pool
    list_pool();

    // Example 2: Queue pool shared between threads
    shared_queue_pool();

    // Example 3: Channel pool with timeouts and close
    channel_pool();

    // Example 4: Validation and metrics
    validation_and_metrics();
}

fn list_pool() {
    println!("1. List Pool:");
    let start = std::time::Instant::now();
    let pool = ListPool::new(256, new_conn, reset_conn);
    println!("   Built {} connections in {:?}", pool.init_size(), start.elapsed());

    let mut conn = pool.get().unwrap();
    conn.addr.push_str("10.0.0.7:5432");
    conn.timeout = Duration::from_secs(5);
    pool.put(conn).unwrap();
    println!("   Available after return: {}\n", pool.available());
}

fn shared_queue_pool() {
    println!("2. Shared Queue Pool:");
    let pool = Arc::new(QueuePool::new(4, new_conn, reset_conn));

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let token = CancelToken::new();
                let conn = pool
                    .b_get_until(Duration::from_millis(5), &token)
                    .unwrap();
                thread::sleep(Duration::from_millis(10));
                pool.put(conn).unwrap();
                i
            })
        })
        .collect();

    for worker in workers {
        let id = worker.join().unwrap();
        println!("   Worker {id} done");
    }
    println!("   Available: {}\n", pool.available());
}

fn channel_pool() {
    println!("3. Channel Pool:");
    let pool = ChannelPool::new(1, new_conn, reset_conn);

    let conn = pool.b_get(Duration::from_millis(100)).unwrap();
    match pool.b_get(Duration::from_millis(100)) {
        Ok(_) => println!("   Unexpected second connection"),
        Err(e) => println!("   Second wait failed: {e}"),
    }

    pool.put(conn).unwrap();
    pool.close();
    println!("   After close: {:?}\n", pool.get().map(|c| c.addr));
}

fn validation_and_metrics() {
    println!("4. Validation and Metrics:");
    let config = PoolConfiguration::new()
        .with_capacity(2)
        .with_validation(|conn: &FakeConn| conn.timeout < Duration::from_secs(60));
    let pool = QueuePool::with_config(config, new_conn, reset_conn);

    let mut conn = pool.get().unwrap();
    conn.timeout = Duration::from_secs(3600);
    if let Err(e) = pool.put(conn) {
        println!("   Return refused: {e}");
    }

    for (key, value) in pool.metrics().export() {
        println!("   {key}: {value}");
    }
}
