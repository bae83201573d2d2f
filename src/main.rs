// sizepool - fixed-size pools of reusable resources

// This is just a binary wrapper - the actual library is in lib.rs
// Run the demo with: cargo run --example basic

use sizepool::{ChannelPool, ListPool, QueuePool, SizePool};
use std::time::Duration;

fn main() {
    println!("=== sizepool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    println!("Quick Demo:");
    let reset = |b: &mut Vec<u8>| b.clear();
    let list: Box<dyn SizePool<Vec<u8>>> = Box::new(ListPool::new(4, Vec::new, reset));
    let queue: Box<dyn SizePool<Vec<u8>>> = Box::new(QueuePool::new(4, Vec::new, reset));
    let channel: Box<dyn SizePool<Vec<u8>>> = Box::new(ChannelPool::new(4, Vec::new, reset));
    let pools = [("list", list), ("queue", queue), ("channel", channel)];

    for (name, pool) in &pools {
        match pool.get() {
            Ok(buf) => {
                println!("  {name}: got a buffer, {} left", pool.available());
                if let Err(e) = pool.put(buf) {
                    println!("  {name}: could not return buffer: {e}");
                }
            }
            Err(e) => println!("  {name}: {e}"),
        }
        println!("  {name}: available after return: {}", pool.available());
    }

    let channel = ChannelPool::new(1, Vec::<u8>::new, |b: &mut Vec<u8>| b.clear());
    let _held = channel.get();
    match channel.b_get(Duration::from_millis(50)) {
        Ok(_) => println!("  channel: got a second buffer"),
        Err(e) => println!("  channel: waited 50ms: {e}"),
    }
}
