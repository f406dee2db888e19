//! Background sweep closing rooms whose clients stopped sending heartbeats.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::room::RoomRegistry;

pub fn spawn_janitor(
    registry: Arc<RoomRegistry>,
    idle_timeout: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let closed = sweep(&registry, idle_timeout).await;
            if closed > 0 {
                tracing::info!(closed, remaining = registry.len(), "Idle rooms swept");
            }
        }
    })
}

/// Close every room idle for longer than `idle_timeout`. Returns how many closed.
pub async fn sweep(registry: &RoomRegistry, idle_timeout: Duration) -> usize {
    let Some(cutoff) = chrono::Duration::from_std(idle_timeout)
        .ok()
        .and_then(|idle| Utc::now().checked_sub_signed(idle))
    else {
        return 0;
    };

    let mut closed = 0;
    for room in registry.rooms() {
        let last_alive_at = room.snapshot().await.last_alive_at;
        if last_alive_at >= cutoff {
            continue;
        }

        tracing::debug!(owner = %room.owner(), last_alive = %last_alive_at, "Closing idle room");
        if room.close().await.was_closed() {
            closed += 1;
        }
    }
    closed
}
