use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rocket::State;
use rocket::get;
use rocket_ws::{Channel, Message as WsMessage, WebSocket};
use tokio::sync::mpsc;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::events;
use crate::models::{ClientEvent, Envelope, ServerEvent};
use crate::rate_limit::{Action, RateLimiter};
use crate::registry::RoomRegistry;
use crate::routes::ClientIp;

/// Frames larger than this are rejected without side effect.
const MAX_FRAME_BYTES: usize = 64 * 1024;

#[get("/ws")]
pub fn ws_upgrade(
    ws: WebSocket,
    ip: ClientIp,
    registry: &State<Arc<RoomRegistry>>,
    rate_limiter: &State<Arc<RateLimiter>>,
    config: &State<Arc<RelayConfig>>,
) -> Channel<'static> {
    let registry = registry.inner().clone();
    let rate_limiter = rate_limiter.inner().clone();
    let config = config.inner().clone();
    let client_key = ip.0;

    ws.channel(move |stream| {
        Box::pin(async move {
            handle_connection(stream, registry, rate_limiter, config, client_key).await;
            Ok(())
        })
    })
}

/// Rooms a single connection currently belongs to, keyed by room hash, value
/// is the peer identifier minted for that room. Lets disconnect cleanup run
/// in time proportional to rooms joined by this connection, not total rooms.
type MembershipSet = HashMap<String, String>;

async fn handle_connection(
    stream: rocket_ws::stream::DuplexStream,
    registry: Arc<RoomRegistry>,
    rate_limiter: Arc<RateLimiter>,
    config: Arc<RelayConfig>,
    client_key: String,
) {
    let (mut sink, mut source) = stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Set whenever a `Pong` arrives on the read side; cleared by the
    // heartbeat tick that sent the `Ping` it acknowledges. If a tick finds
    // it already clear, the previous heartbeat went unanswered for a full
    // interval and the connection is terminated as if disconnected.
    let pong_received = Arc::new(AtomicBool::new(true));
    let heartbeat_pong = pong_received.clone();

    let heartbeat_interval = Duration::from_secs(config.heartbeat_interval_secs);
    let send_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(heartbeat_interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                msg = outbound_rx.recv() => {
                    match msg {
                        Some(event) => {
                            if let Ok(text) = serde_json::to_string(&event)
                                && sink.send(WsMessage::Text(text)).await.is_err()
                            {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !heartbeat_pong.swap(false, Ordering::Relaxed) {
                        let _ = sink.close().await;
                        break;
                    }
                    if sink.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut memberships: MembershipSet = HashMap::new();

    while let Some(next) = source.next().await {
        let message = match next {
            Ok(m) => m,
            Err(_) => break,
        };

        match message {
            WsMessage::Text(text) => {
                if text.len() > MAX_FRAME_BYTES {
                    events::send_one(
                        &outbound_tx,
                        ServerEvent::error(&RelayError::InvalidFormat, None),
                    );
                    continue;
                }
                handle_frame(
                    &text,
                    &registry,
                    &rate_limiter,
                    &config,
                    &client_key,
                    &outbound_tx,
                    &mut memberships,
                )
                .await;
            }
            WsMessage::Pong(_) => {
                pong_received.store(true, Ordering::Relaxed);
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    cleanup_on_disconnect(&registry, &memberships).await;
    send_task.abort();
}

async fn handle_frame(
    text: &str,
    registry: &Arc<RoomRegistry>,
    rate_limiter: &Arc<RateLimiter>,
    config: &Arc<RelayConfig>,
    client_key: &str,
    outbound_tx: &mpsc::UnboundedSender<ServerEvent>,
    memberships: &mut MembershipSet,
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(_) => {
            events::send_one(
                outbound_tx,
                ServerEvent::error(&RelayError::InvalidFormat, None),
            );
            return;
        }
    };

    match event {
        ClientEvent::Ping => {
            events::send_one(outbound_tx, ServerEvent::Pong);
        }
        ClientEvent::CreateRoom { room_hash, ttl } => {
            if let Err(err) = rate_limiter.check(client_key, Action::Create) {
                events::send_one(outbound_tx, ServerEvent::error(&err, Some(room_hash)));
                return;
            }
            let ttl = config.clamp_ttl_secs(ttl);
            match registry
                .create(room_hash.clone(), ttl, Some(outbound_tx.clone()))
                .await
            {
                Ok((resp, _handle)) => {
                    memberships.insert(room_hash.clone(), resp.peer_id.clone());
                    events::send_one(
                        outbound_tx,
                        ServerEvent::RoomCreated {
                            room_hash,
                            peer_id: resp.peer_id,
                            delete_token: resp.delete_token,
                        },
                    );
                }
                Err(err) => {
                    events::send_one(outbound_tx, ServerEvent::error(&err, Some(room_hash)));
                }
            }
        }
        ClientEvent::JoinRoom { room_hash } => {
            if let Err(err) = rate_limiter.check(client_key, Action::Join) {
                events::send_one(outbound_tx, ServerEvent::error(&err, Some(room_hash)));
                return;
            }
            let Some(handle) = registry.lookup(&room_hash).await else {
                events::send_one(
                    outbound_tx,
                    ServerEvent::error(&RelayError::RoomError, Some(room_hash)),
                );
                return;
            };
            let peer_id = crate::ids::new_peer_id();
            let mut room = handle.lock().await;
            match room.join(peer_id.clone(), Some(outbound_tx.clone())) {
                Ok(change) => {
                    let others = room.all_push_senders_excluding(&peer_id);
                    drop(room);
                    memberships.insert(room_hash.clone(), peer_id.clone());
                    events::send_one(
                        outbound_tx,
                        ServerEvent::RoomJoined {
                            room_hash: room_hash.clone(),
                            peer_id: peer_id.clone(),
                            peer_count: change.peer_count,
                        },
                    );
                    events::fan_out(
                        &others,
                        ServerEvent::PeerJoined {
                            room_hash,
                            peer_id,
                            peer_count: change.peer_count,
                        },
                    );
                }
                Err(err) => {
                    events::send_one(outbound_tx, ServerEvent::error(&err, Some(room_hash)));
                }
            }
        }
        ClientEvent::LeaveRoom { room_hash } => {
            let Some(peer_id) = memberships.remove(&room_hash) else {
                events::send_one(
                    outbound_tx,
                    ServerEvent::error(&RelayError::RoomError, Some(room_hash)),
                );
                return;
            };
            leave_room(registry, &room_hash, &peer_id).await;
        }
        ClientEvent::DeleteRoom {
            room_hash,
            delete_token,
        } => {
            let Some(handle) = registry.lookup(&room_hash).await else {
                events::send_one(
                    outbound_tx,
                    ServerEvent::error(&RelayError::RoomError, Some(room_hash)),
                );
                return;
            };
            let (matches, senders) = {
                let room = handle.lock().await;
                (
                    room.token_matches(&delete_token),
                    room.all_push_senders(),
                )
            };
            if !matches {
                events::send_one(
                    outbound_tx,
                    ServerEvent::error(&RelayError::InvalidDeleteToken, Some(room_hash)),
                );
                return;
            }
            registry.destroy(&room_hash).await;
            events::fan_out(
                &senders,
                ServerEvent::RoomDeleted {
                    room_hash: room_hash.clone(),
                },
            );
            memberships.remove(&room_hash);
        }
        ClientEvent::Message { envelope } => {
            if let Err(err) = rate_limiter.check(client_key, Action::Message) {
                events::send_one(
                    outbound_tx,
                    ServerEvent::error(&err, Some(envelope.room.clone())),
                );
                return;
            }
            if !envelope.is_structurally_valid() {
                events::send_one(
                    outbound_tx,
                    ServerEvent::error(&RelayError::InvalidEnvelope, Some(envelope.room.clone())),
                );
                return;
            }
            let room_hash = envelope.room.clone();
            let Some(handle) = registry.lookup(&room_hash).await else {
                events::send_one(
                    outbound_tx,
                    ServerEvent::error(&RelayError::RoomError, Some(room_hash)),
                );
                return;
            };
            let from = envelope.from.clone();
            let mut room = handle.lock().await;
            match room.accept_message(&from, envelope.clone()) {
                Ok(targets) => {
                    drop(room);
                    events::fan_out(&targets, ServerEvent::Message { envelope });
                }
                Err(err) => {
                    events::send_one(outbound_tx, ServerEvent::error(&err, Some(room_hash)));
                }
            }
        }
    }
}

async fn leave_room(registry: &Arc<RoomRegistry>, room_hash: &str, peer_id: &str) {
    let Some(handle) = registry.lookup(room_hash).await else {
        return;
    };
    let (change, others) = {
        let mut room = handle.lock().await;
        let change = room.leave(peer_id);
        let others = room.all_push_senders();
        (change, others)
    };
    if let Ok(change) = change {
        if change.now_empty {
            registry.destroy_if_empty(room_hash).await;
        } else {
            events::fan_out(
                &others,
                ServerEvent::PeerLeft {
                    room_hash: room_hash.to_string(),
                    peer_id: peer_id.to_string(),
                    peer_count: change.peer_count,
                },
            );
        }
    }
}

async fn cleanup_on_disconnect(registry: &Arc<RoomRegistry>, memberships: &MembershipSet) {
    for (room_hash, peer_id) in memberships {
        leave_room(registry, room_hash, peer_id).await;
    }
}
