//! Liveness sweeper.
//!
//! Periodically evicts presence entries whose last activity is older than
//! the staleness threshold and announces each evicted user offline. Runs on
//! a fixed interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use parley_core::types::{now, Timestamp, UserId};
use tokio_util::sync::CancellationToken;

use crate::config::PresenceConfig;
use crate::presence::{PresenceNotifier, PresenceStore};

/// Run one sweep as of `at`.
///
/// Every evicted user is announced offline exactly once; the eviction and
/// an explicit disconnect cannot both announce the same departure because
/// only one of them removes the entry.
pub fn sweep_once(
    presence: &PresenceStore,
    notifier: &PresenceNotifier,
    at: Timestamp,
    stale_after: Duration,
) -> Vec<UserId> {
    presence.sweep_then(at, stale_after, |user_id| {
        tracing::info!(user_id = %user_id, "Presence entry went stale, evicting");
        notifier.announce(user_id, false);
    })
}

/// Run the liveness sweep loop.
///
/// Runs until `cancel` is triggered.
pub async fn run(
    presence: Arc<PresenceStore>,
    notifier: Arc<PresenceNotifier>,
    config: PresenceConfig,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = config.sweep_interval.as_secs(),
        stale_secs = config.stale_after.as_secs(),
        "Presence sweep job started"
    );

    let mut interval = tokio::time::interval(config.sweep_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Presence sweep job stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = sweep_once(&presence, &notifier, now(), config.stale_after);
                if evicted.is_empty() {
                    tracing::debug!(online = presence.len(), "Presence sweep: nothing stale");
                } else {
                    tracing::info!(evicted = evicted.len(), "Presence sweep: evicted stale users");
                }
            }
        }
    }
}
