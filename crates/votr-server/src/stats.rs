//! Periodic room and user counts in the log.

use std::{sync::Arc, time::Duration};

use tokio::time::{MissedTickBehavior, interval};
use votr_core::Environment;

use crate::registry::RoomRegistry;

/// Log registry totals every `every` until the task is aborted.
pub async fn report<E: Environment>(registry: Arc<RoomRegistry<E>>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let stats = registry.stats().await;
        tracing::info!(rooms = stats.rooms, users = stats.members, "Room statistics");
    }
}
