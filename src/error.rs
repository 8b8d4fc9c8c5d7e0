use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use thiserror::Error;

/// Every wire error code the relay can return, on either transport.
///
/// `ROOM_ERROR` is deliberately generic: it covers room-not-found,
/// hash-collision-on-create, and any other lookup failure, so that a client
/// cannot distinguish "never existed" from "just expired" from "already
/// taken" by probing.
#[derive(Debug, Error, Clone)]
pub enum RelayError {
    #[error("room error")]
    RoomError,

    #[error("room is full")]
    RoomFull,

    #[error("not a member of this room")]
    NotInRoom,

    #[error("invalid delete token")]
    InvalidDeleteToken,

    #[error("invalid envelope")]
    InvalidEnvelope,

    #[error("invalid format")]
    InvalidFormat,

    #[error("rate limited")]
    RateLimited { retry_after_secs: u64, limit: u32 },

    #[error("capacity exceeded")]
    CapacityExceeded,
}

impl RelayError {
    /// The wire error code, part of the external contract.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::RoomError => "ROOM_ERROR",
            RelayError::RoomFull => "ROOM_FULL",
            RelayError::NotInRoom => "NOT_IN_ROOM",
            RelayError::InvalidDeleteToken => "INVALID_DELETE_TOKEN",
            RelayError::InvalidEnvelope => "INVALID_ENVELOPE",
            RelayError::InvalidFormat => "INVALID_FORMAT",
            RelayError::RateLimited { .. } => "RATE_LIMITED",
            RelayError::CapacityExceeded => "CAPACITY_EXCEEDED",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            RelayError::RoomError => Status::NotFound,
            RelayError::RoomFull => Status::Forbidden,
            RelayError::NotInRoom => Status::Forbidden,
            RelayError::InvalidDeleteToken => Status::Forbidden,
            RelayError::InvalidEnvelope => Status::BadRequest,
            RelayError::InvalidFormat => Status::BadRequest,
            RelayError::RateLimited { .. } => Status::TooManyRequests,
            RelayError::CapacityExceeded => Status::ServiceUnavailable,
        }
    }

    /// Shape used by the push transport's `error` event and by the poll
    /// transport's JSON error bodies alike.
    pub fn to_json(&self, room_hash: Option<&str>) -> serde_json::Value {
        let mut body = serde_json::json!({
            "message": self.to_string(),
            "code": self.code(),
        });
        if let Some(hash) = room_hash {
            body["roomHash"] = serde_json::Value::String(hash.to_string());
        }
        if let RelayError::RateLimited {
            retry_after_secs,
            limit,
        } = self
        {
            body["retry_after_secs"] = (*retry_after_secs).into();
            body["limit"] = (*limit).into();
        }
        body
    }
}

impl<'r> Responder<'r, 'static> for RelayError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let body = Json(self.to_json(None));
        let mut res = body.respond_to(req)?;
        res.set_status(status);
        Ok(res)
    }
}
