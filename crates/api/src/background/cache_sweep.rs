//! Periodic purge of expired widget cache entries.
//!
//! Expired entries are already ignored on read; this task only reclaims
//! their memory. Runs on a fixed interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use perfolio_core::widgets::MemoryWidgetCache;
use tokio_util::sync::CancellationToken;

/// Run the cache sweep loop until `cancel` is triggered.
pub async fn run(cache: Arc<MemoryWidgetCache>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Widget cache sweep started"
    );

    // `interval` panics on a zero period.
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Widget cache sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                let purged = cache.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, remaining = cache.len(), "Widget cache: purged expired entries");
                }
            }
        }
    }
}
