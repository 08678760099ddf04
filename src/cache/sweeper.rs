//! Background expiry sweep.
//!
//! Expired cache entries and stale rate-limit windows are removed by one
//! owned background task on a fixed cadence, instead of ad-hoc checks
//! scattered through the request path. The task holds only the handles it
//! was given at spawn time; nothing here is process-global.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::debug;

/// Anything the sweeper can periodically prune.
pub trait Sweep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Remove expired state; returns how many entries were dropped.
    fn sweep(&self) -> usize;
}

/// Spawn the sweep task. The handle is returned so the caller owns the
/// task's lifecycle; dropping the runtime tears it down with the process.
pub fn spawn_sweeper(targets: Vec<Arc<dyn Sweep>>, cadence: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cadence);
        // The first tick fires immediately; skip it so a fresh process does
        // not sweep empty state.
        interval.tick().await;

        loop {
            interval.tick().await;
            for target in &targets {
                let removed = target.sweep();
                if removed > 0 {
                    counter!("vetrina_sweep_removed_total", "target" => target.name())
                        .increment(removed as u64);
                    debug!(
                        target_module = "cache::sweeper",
                        sweep_target = target.name(),
                        removed,
                        "sweep pass removed expired entries"
                    );
                }
            }
        }
    })
}
