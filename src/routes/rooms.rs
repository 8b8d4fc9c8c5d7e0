use std::sync::Arc;

use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{delete, post};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::models::{CreateRoomRequest, CreateRoomResponse, DeleteResponse, JoinRoomResponse};
use crate::rate_limit::{Action, RateLimiter};
use crate::registry::RoomRegistry;

use super::ClientIp;

#[post("/rooms", format = "json", data = "<body>")]
pub async fn create_room(
    registry: &State<Arc<RoomRegistry>>,
    rate_limiter: &State<Arc<RateLimiter>>,
    config: &State<Arc<RelayConfig>>,
    ip: ClientIp,
    body: Json<CreateRoomRequest>,
) -> Result<(Status, Json<CreateRoomResponse>), (Status, Json<serde_json::Value>)> {
    rate_limiter
        .check(&ip.0, Action::Create)
        .map_err(error_response)?;

    let ttl = config.clamp_ttl_secs(body.ttl);
    match registry.create(body.room_hash.clone(), ttl, None).await {
        Ok((resp, _handle)) => Ok((Status::Created, Json(resp))),
        // Duplicate hash: the generic ROOM_ERROR code is shared with the
        // lookup routes' 404, but here it is a 409 since creation failed
        // because something is already there, not because nothing was found.
        Err(err @ RelayError::RoomError) => Err((Status::Conflict, Json(err.to_json(None)))),
        Err(err) => Err(error_response(err)),
    }
}

fn error_response(err: RelayError) -> (Status, Json<serde_json::Value>) {
    (err.status(), Json(err.to_json(None)))
}

#[post("/rooms/<hash>/join")]
pub async fn join_room(
    registry: &State<Arc<RoomRegistry>>,
    rate_limiter: &State<Arc<RateLimiter>>,
    ip: ClientIp,
    hash: &str,
) -> Result<Json<JoinRoomResponse>, RelayError> {
    rate_limiter.check(&ip.0, Action::Join)?;

    let handle = registry.lookup(hash).await.ok_or(RelayError::RoomError)?;
    let peer_id = crate::ids::new_peer_id();
    let mut room = handle.lock().await;
    let change = room.join(peer_id.clone(), None)?;
    let others = room.all_push_senders();
    drop(room);

    crate::events::fan_out(
        &others,
        crate::models::ServerEvent::PeerJoined {
            room_hash: hash.to_string(),
            peer_id: peer_id.clone(),
            peer_count: change.peer_count,
        },
    );

    Ok(Json(JoinRoomResponse {
        room_hash: hash.to_string(),
        peer_id,
        peer_count: change.peer_count,
    }))
}

#[delete("/rooms/<hash>")]
pub async fn delete_room(
    registry: &State<Arc<RoomRegistry>>,
    hash: &str,
    delete_token: DeleteTokenHeader,
) -> Result<Json<DeleteResponse>, RelayError> {
    let handle = registry.lookup(hash).await.ok_or(RelayError::RoomError)?;
    let (matches, senders) = {
        let room = handle.lock().await;
        (room.token_matches(&delete_token.0), room.all_push_senders())
    };
    if !matches {
        return Err(RelayError::InvalidDeleteToken);
    }
    registry.destroy(hash).await;
    crate::events::fan_out(
        &senders,
        crate::models::ServerEvent::RoomDeleted {
            room_hash: hash.to_string(),
        },
    );
    Ok(Json(DeleteResponse { deleted: true }))
}

/// The `X-Delete-Token` header required to authorize `DELETE /rooms/:hash`.
pub struct DeleteTokenHeader(pub String);

#[rocket::async_trait]
impl<'r> rocket::request::FromRequest<'r> for DeleteTokenHeader {
    type Error = ();

    async fn from_request(
        req: &'r rocket::request::Request<'_>,
    ) -> rocket::request::Outcome<Self, Self::Error> {
        match req.headers().get_one("X-Delete-Token") {
            Some(token) => rocket::request::Outcome::Success(DeleteTokenHeader(token.to_string())),
            None => rocket::request::Outcome::Success(DeleteTokenHeader(String::new())),
        }
    }
}
