use std::sync::Arc;
use std::time::Duration;

use rocket::fairing::AdHoc;

use crate::config::RelayConfig;
use crate::events;
use crate::models::ServerEvent;
use crate::registry::RoomRegistry;

/// Wires graceful shutdown: on SIGINT/SIGTERM, drain every live room (notify
/// members, close push connections) under a hard deadline, then tell Rocket
/// to stop accepting new work.
pub fn fairing() -> AdHoc {
    AdHoc::on_liftoff("graceful shutdown listener", |rocket| {
        Box::pin(async move {
            let registry = rocket
                .state::<Arc<RoomRegistry>>()
                .expect("RoomRegistry managed")
                .clone();
            let config = rocket
                .state::<Arc<RelayConfig>>()
                .expect("RelayConfig managed")
                .clone();
            let shutdown = rocket.shutdown();

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                eprintln!("🛑 shutdown signal received, draining rooms");

                let deadline = Duration::from_secs(config.shutdown_deadline_secs);
                let drained = tokio::time::timeout(deadline, drain_all_rooms(&registry)).await;
                match drained {
                    Ok(()) => {
                        eprintln!("✅ drain complete, shutting down");
                        shutdown.notify();
                    }
                    Err(_) => {
                        // The deadline bounds stop time for orchestrators; exit 1
                        // marks this as a forced, not clean, shutdown.
                        eprintln!("⚠️ drain deadline exceeded, forcing shutdown");
                        std::process::exit(1);
                    }
                }
            });
        })
    })
}

async fn drain_all_rooms(registry: &Arc<RoomRegistry>) {
    let snapshot = registry.snapshot().await;
    for (hash, handle) in snapshot {
        let senders = {
            let room = handle.lock().await;
            room.all_push_senders()
        };
        events::fan_out(
            &senders,
            ServerEvent::RoomExpired {
                room_hash: hash.clone(),
            },
        );
        registry.destroy(&hash).await;
    }
}
