//! Clock sync monitor
//!
//! Locks onto a reference peer and prints the model once per second.
//!
//! ```text
//! cargo run --example monitor                 # mDNS lookup of screamrouter.local
//! cargo run --example monitor -- 10.0.0.5     # unicast host on port 123
//! cargo run --example monitor -- 10.0.0.5 1123
//! ```

use std::time::Duration;

use netclock::{ClockSyncService, PeerSource, SyncConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("netclock=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let peer = match args.next() {
        Some(host) => {
            let port = args.next().map(|p| p.parse()).transpose()?.unwrap_or(0);
            PeerSource::host(host, port)
        }
        None => PeerSource::default(),
    };

    println!("Synchronizing to {peer}...");
    let config = SyncConfig::builder().peer(peer).build();
    let mut handle = ClockSyncService::start(&config)?;
    let clock = handle.reader();

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = handle.status();
                match (clock.get_state(), clock.convergence()) {
                    (Ok(state), Ok(convergence)) => println!(
                        "{:?} bursts={} offset={:.0}us skew={:+.2}ppm error={}us{}",
                        status.cadence.phase(),
                        status.cadence.bursts_completed(),
                        state.offset_us,
                        state.skew_ppm,
                        convergence.last_error_us,
                        if convergence.converged { " (converged)" } else { "" },
                    ),
                    _ => println!(
                        "waiting for reference (peer={:?}, failed bursts={})",
                        status.peer, status.failed_bursts
                    ),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown().await;
    Ok(())
}
