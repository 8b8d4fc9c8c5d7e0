use rocket::local::blocking::Client;

use ghostrelay::config::RelayConfig;

/// A relay instance with its defaults, isolated per test (no shared process
/// state — each `Client::tracked` call builds a fresh `Relay`).
pub fn test_client() -> Client {
    Client::tracked(ghostrelay::rocket_with_config(RelayConfig::from_env()))
        .expect("valid rocket instance")
}

/// A relay instance with a config override, for tests that need tiny rate
/// limits, a tiny capacity, or a short TTL without waiting out the real
/// defaults.
pub fn test_client_with_config(config: RelayConfig) -> Client {
    Client::tracked(ghostrelay::rocket_with_config(config)).expect("valid rocket instance")
}

pub fn base_config() -> RelayConfig {
    RelayConfig::from_env()
}

/// Creates a room via the poll surface and returns `(roomHash, peerId, deleteToken)`.
pub fn create_room(client: &Client, hash: &str, ttl: u64) -> (String, String, String) {
    let res = client
        .post("/rooms")
        .header(rocket::http::ContentType::JSON)
        .body(format!(r#"{{"roomHash":"{hash}","ttl":{ttl}}}"#))
        .dispatch();
    let body: serde_json::Value = res.into_json().expect("json body");
    (
        body["roomHash"].as_str().unwrap().to_string(),
        body["peerId"].as_str().unwrap().to_string(),
        body["deleteToken"].as_str().unwrap().to_string(),
    )
}

pub fn envelope_body(room: &str, from: &str, payload: &str, nonce: &str, ts: i64) -> String {
    format!(
        r#"{{"peerId":"{from}","envelope":{{"room":"{room}","from":"{from}","payload":"{payload}","nonce":"{nonce}","ts":{ts}}}}}"#
    )
}
