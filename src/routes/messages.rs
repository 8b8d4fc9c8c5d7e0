use std::sync::Arc;

use rocket::form::FromForm;
use rocket::State;
use rocket::serde::json::Json;
use rocket::{get, post};

use crate::error::RelayError;
use crate::models::{
    LeaveRequest, LeaveResponse, PollResponse, SendEnvelopeRequest, SendEnvelopeResponse,
};
use crate::rate_limit::{Action, RateLimiter};
use crate::registry::RoomRegistry;

use super::ClientIp;

#[post("/rooms/<hash>/send", format = "json", data = "<body>")]
pub async fn send_message(
    registry: &State<Arc<RoomRegistry>>,
    rate_limiter: &State<Arc<RateLimiter>>,
    ip: ClientIp,
    hash: &str,
    body: Json<SendEnvelopeRequest>,
) -> Result<Json<SendEnvelopeResponse>, RelayError> {
    rate_limiter.check(&ip.0, Action::Message)?;

    if !body.envelope.is_structurally_valid() {
        return Err(RelayError::InvalidEnvelope);
    }

    let handle = registry.lookup(hash).await.ok_or(RelayError::RoomError)?;
    let mut room = handle.lock().await;
    let targets = room.accept_message(&body.peer_id, body.envelope.clone())?;
    // Refresh poll-peer liveness on any successful request referencing a
    // known peerId; a no-op (and ignored) if the sender is a push member.
    let _ = room.touch_poll_peer(&body.peer_id);
    drop(room);
    crate::events::fan_out(
        &targets,
        crate::models::ServerEvent::Message {
            envelope: body.envelope.clone(),
        },
    );
    Ok(Json(SendEnvelopeResponse { sent: true }))
}

/// The poll peer field is spelled `peerId` on the wire, so it is renamed
/// off of Rust's snake_case convention here rather than in every other
/// wire struct.
#[derive(FromForm)]
pub struct PollQuery {
    since: Option<i64>,
    #[field(name = "peerId")]
    peer_id: Option<String>,
}

#[get("/rooms/<hash>/poll?<query..>")]
pub async fn poll_room(
    registry: &State<Arc<RoomRegistry>>,
    hash: &str,
    query: PollQuery,
) -> Result<Json<PollResponse>, RelayError> {
    let handle = registry.lookup(hash).await.ok_or(RelayError::RoomError)?;
    let since = query.since.unwrap_or(-1);

    let mut room = handle.lock().await;
    if let Some(peer_id) = &query.peer_id {
        // Best-effort liveness refresh; absence of this peer among poll
        // members is not itself fatal to the poll (it may be a push member).
        let _ = room.touch_poll_peer(peer_id);
    }
    let messages = room.poll_since(since);
    let peer_count = room.peer_count();
    drop(room);

    Ok(Json(PollResponse {
        messages,
        peer_count,
        room_hash: hash.to_string(),
    }))
}

#[post("/rooms/<hash>/leave", format = "json", data = "<body>")]
pub async fn leave_room(
    registry: &State<Arc<RoomRegistry>>,
    hash: &str,
    body: Json<LeaveRequest>,
) -> Result<Json<LeaveResponse>, RelayError> {
    let handle = registry.lookup(hash).await.ok_or(RelayError::RoomError)?;

    let (change, others) = {
        let mut room = handle.lock().await;
        let change = room.leave(&body.peer_id)?;
        let others = room.all_push_senders();
        (change, others)
    };

    if change.now_empty {
        registry.destroy_if_empty(hash).await;
    } else {
        crate::events::fan_out(
            &others,
            crate::models::ServerEvent::PeerLeft {
                room_hash: hash.to_string(),
                peer_id: body.peer_id.clone(),
                peer_count: change.peer_count,
            },
        );
    }

    Ok(Json(LeaveResponse { left: true }))
}
