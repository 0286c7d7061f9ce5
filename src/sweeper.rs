// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Cache Sweeper
//!
//! Background task that purges expired entries from the in-process caches.
//! Reads already ignore expired entries; the sweeper only reclaims memory for
//! sessions and trip mappings nobody asks for again.
//!
//! ## Shutdown
//!
//! Stops when its `CancellationToken` is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::Purge;

/// Default interval between sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct CacheSweeper {
    caches: Vec<(&'static str, Arc<dyn Purge>)>,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(caches: Vec<(&'static str, Arc<dyn Purge>)>) -> Self {
        Self {
            caches,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            caches = self.caches.len(),
            "Cache sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Cache sweeper shutting down");
                    return;
                }
            }

            self.sweep();
        }
    }

    /// Purge every cache once. Returns the total number of entries removed.
    pub fn sweep(&self) -> usize {
        let mut total = 0;
        for (name, cache) in &self.caches {
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!(cache = name, purged, "Purged expired entries");
            }
            total += purged;
        }
        total
    }
}
