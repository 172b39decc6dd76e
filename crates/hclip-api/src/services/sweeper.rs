//! Background eviction of expired request namespaces.
//!
//! Rendered clips stay retrievable until their request directory is older
//! than the configured TTL; after that the sweeper removes it and retrieval
//! reports not-found.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use hclip_pipeline::ScratchSpace;

use crate::metrics;

/// Scratch sweeper service.
pub struct ScratchSweeper {
    scratch: ScratchSpace,
    ttl: Duration,
    interval: Duration,
}

impl ScratchSweeper {
    /// Create a new sweeper. A zero `ttl` disables eviction.
    pub fn new(scratch: ScratchSpace, ttl: Duration, interval: Duration) -> Self {
        Self {
            scratch,
            ttl,
            interval,
        }
    }

    pub fn enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Start the background sweep loop.
    ///
    /// This function runs indefinitely and should be spawned as a background task.
    pub async fn run(&self) {
        if !self.enabled() {
            info!("Artifact eviction is disabled");
            return;
        }

        info!(
            "Starting scratch sweeper (ttl: {:?}, interval: {:?})",
            self.ttl, self.interval
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = self.sweep_once().await {
                error!("Scratch sweep error: {}", e);
            }
        }
    }

    /// Run a single sweep and return the number of evicted namespaces.
    pub async fn sweep_once(&self) -> anyhow::Result<usize> {
        if !self.enabled() {
            return Ok(0);
        }

        let removed = self.scratch.sweep_expired(self.ttl).await?;
        if removed > 0 {
            metrics::record_artifacts_evicted(removed);
            info!(
                root = %self.scratch.root().display(),
                "Evicted {} expired request namespace(s)", removed
            );
        }

        Ok(removed)
    }
}
