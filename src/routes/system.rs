use std::sync::Arc;
use std::time::Instant;

use rocket::fairing::AdHoc;
use rocket::http::Header;
use rocket::serde::json::Json;
use rocket::{State, catch, get};

use crate::config::RelayConfig;
use crate::models::{HealthLimits, HealthMemory, HealthPeers, HealthResponse};
use crate::registry::RoomRegistry;

/// Security headers applied to every response: `X-Content-Type-Options`,
/// `X-Frame-Options`, `Referrer-Policy`, and HSTS. CORS itself is handled
/// by the `rocket_cors` fairing attached alongside this one; `OPTIONS`
/// preflights pick these headers up too since this fairing runs on every
/// response regardless of route.
pub fn security_headers_fairing() -> AdHoc {
    AdHoc::on_response("security headers", |_req, res| {
        Box::pin(async move {
            res.set_header(Header::new("X-Content-Type-Options", "nosniff"));
            res.set_header(Header::new("X-Frame-Options", "DENY"));
            res.set_header(Header::new("Referrer-Policy", "no-referrer"));
            res.set_header(Header::new(
                "Strict-Transport-Security",
                "max-age=63072000; includeSubDomains",
            ));
        })
    })
}

#[get("/health")]
pub async fn health(
    registry: &State<Arc<RoomRegistry>>,
    config: &State<Arc<RelayConfig>>,
    started_at: &State<Instant>,
) -> Json<HealthResponse> {
    let (ws, http) = registry.member_totals().await;
    let rooms = registry.len().await;

    Json(HealthResponse {
        status: "ok",
        uptime: started_at.elapsed().as_secs(),
        rooms,
        peers: HealthPeers {
            ws,
            http,
            total: ws + http,
        },
        memory: process_memory(),
        limits: HealthLimits {
            room_capacity: config.room_capacity,
            room_max_members: config.room_max_members,
            room_backlog_cap: config.room_backlog_cap,
        },
    })
}

/// Best-effort process memory footprint. Reading actual RSS/heap is
/// platform-specific and out of scope for this relay's own health probe;
/// this reports zero where the platform isn't read.
fn process_memory() -> HealthMemory {
    HealthMemory { rss: 0, heap: 0 }
}

#[catch(429)]
pub fn too_many_requests() -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": "rate limited", "code": "RATE_LIMITED"}))
}

#[catch(404)]
pub fn not_found() -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": "not found", "code": "ROOM_ERROR"}))
}
