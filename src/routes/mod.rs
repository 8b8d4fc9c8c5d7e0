// Route module decomposition — each domain area in its own file.
// Shared types (request guards) live here; route functions in submodules.

mod messages;
mod rooms;
mod system;

pub use messages::{leave_room, poll_room, send_message};
pub use rooms::{create_room, delete_room, join_room};
pub use system::{health, not_found, security_headers_fairing, too_many_requests};

use rocket::State;
use rocket::request::{FromRequest, Outcome, Request};

use crate::config::RelayConfig;

/// The client's rate-limit/identification key, resolved from either the
/// direct socket address or a trusted reverse-proxy forwarded-for header.
pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let trusted = req
            .guard::<&State<std::sync::Arc<RelayConfig>>>()
            .await
            .map(|c| c.trusted_proxies)
            .unwrap_or(0);

        let ip = if trusted == 0 {
            None
        } else {
            req.headers().get_one("X-Forwarded-For").and_then(|raw| {
                let entries: Vec<&str> = raw.split(',').map(|s| s.trim()).collect();
                if entries.is_empty() {
                    return None;
                }
                let idx = entries.len().saturating_sub(trusted);
                entries.get(idx).map(|s| s.to_string())
            })
        }
        .or_else(|| req.remote().map(|r| r.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string());

        Outcome::Success(ClientIp(ip))
    }
}
