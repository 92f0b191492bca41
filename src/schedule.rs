//! Fixed-delay repetition of [`Pipeline::run_cycle`].
//!
//! Shutdown is a `watch` flag rather than a signal future so a request made
//! while a cycle is running is still seen once the cycle ends.

use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use crate::pipeline::Pipeline;

/// Run cycles until shutdown is requested, waiting `interval` between the end
/// of one cycle and the start of the next. Returns the number of cycles run.
pub async fn run_until_shutdown(
    pipeline: &Pipeline,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let mut cycles = 0;

    loop {
        pipeline.run_cycle().await;
        cycles += 1;

        if *shutdown.borrow_and_update() {
            info!("Shutdown requested during cycle, stopping");
            break;
        }

        info!("Next cycle in {}s", interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown_requested(&mut shutdown) => {
                info!("Shutdown requested, stopping");
                break;
            }
        }
    }

    cycles
}

/// Resolves once the flag turns true; never resolves if the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}
