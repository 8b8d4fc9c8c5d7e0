use std::sync::Arc;
use std::time::Duration;

use crate::config::RelayConfig;
use crate::events;
use crate::models::ServerEvent;
use crate::rate_limit::RateLimiter;
use crate::registry::RoomRegistry;

/// Spawns the background sweep loop. Three independent sweeps run every
/// interval: TTL-expired rooms, idle poll peers, and stale rate-limit
/// windows. Each logs a one-line summary only when it actually destroyed
/// or evicted something, to keep routine operation quiet.
pub fn spawn(
    registry: Arc<RoomRegistry>,
    rate_limiter: Arc<RateLimiter>,
    config: Arc<RelayConfig>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let interval = Duration::from_secs(config.janitor_interval_secs);
        let poll_timeout = Duration::from_secs(config.poll_peer_timeout_secs);

        loop {
            tokio::time::sleep(interval).await;
            sweep_expired_rooms(&registry).await;
            sweep_idle_poll_peers(&registry, poll_timeout).await;
            let stale_windows = rate_limiter.sweep_stale();
            if stale_windows > 0 {
                eprintln!("🧹 janitor: dropped {stale_windows} stale rate-limit windows");
            }
        }
    })
}

async fn sweep_expired_rooms(registry: &Arc<RoomRegistry>) {
    let snapshot = registry.snapshot().await;
    let mut expired = 0;
    for (hash, handle) in snapshot {
        let (is_expired, senders) = {
            let room = handle.lock().await;
            (room.is_expired(), room.all_push_senders())
        };
        if is_expired {
            registry.destroy(&hash).await;
            events::fan_out(&senders, ServerEvent::RoomExpired { room_hash: hash });
            expired += 1;
        }
    }
    if expired > 0 {
        eprintln!("🧹 janitor: expired {expired} room(s) past their TTL");
    }
}

async fn sweep_idle_poll_peers(registry: &Arc<RoomRegistry>, timeout: Duration) {
    let snapshot = registry.snapshot().await;
    let mut evicted_total = 0;
    for (hash, handle) in snapshot {
        let (evicted, now_empty, senders) = {
            let mut room = handle.lock().await;
            let evicted = room.evict_idle_poll_peers(timeout);
            (evicted, room.is_empty(), room.all_push_senders())
        };
        if evicted.is_empty() {
            continue;
        }
        evicted_total += evicted.len();
        if now_empty {
            registry.destroy_if_empty(&hash).await;
        } else {
            let peer_count = {
                let room = handle.lock().await;
                room.peer_count()
            };
            for peer_id in evicted {
                events::fan_out(
                    &senders,
                    ServerEvent::PeerLeft {
                        room_hash: hash.clone(),
                        peer_id,
                        peer_count,
                    },
                );
            }
        }
    }
    if evicted_total > 0 {
        eprintln!("🧹 janitor: evicted {evicted_total} idle poll peer(s)");
    }
}
