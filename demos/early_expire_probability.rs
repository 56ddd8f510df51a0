//! Prints the share of early expirations observed every half second while an
//! entry with a one second recompute time approaches its 60 second TTL.
//!
//! Set `RUST_LOG=xfetch_entry=trace` to see the individual decisions.

use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use xfetch_entry::CacheEntry;

const SAMPLES: u32 = 1000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let entry = CacheEntry::builder(|| {
        thread::sleep(Duration::from_secs(1));
        42
    })
    .with_ttl(|_| Duration::from_secs(60))
    .build();
    println!("# delta = {:?}, beta = {}", entry.delta(), entry.beta());

    let start = Instant::now();
    for _ in 0..120 {
        thread::sleep(Duration::from_millis(500));
        let early_expire = (0..SAMPLES).filter(|_| entry.is_expired()).count();
        println!(
            "{:.1} {}",
            start.elapsed().as_secs_f64(),
            early_expire as f64 / f64::from(SAMPLES)
        );
    }
}
