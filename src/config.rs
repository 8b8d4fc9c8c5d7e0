use std::env;

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// All relay tunables, read once at startup from the environment, each
/// with a sane default for local development.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub cors_origin: String,
    pub trusted_proxies: usize,
    pub log_level: String,

    pub rate_limit_window_secs: u64,
    pub rate_limit_creates: u32,
    pub rate_limit_joins: u32,
    pub rate_limit_messages: u32,

    pub room_capacity: usize,
    pub room_max_members: usize,
    pub room_backlog_cap: usize,

    pub poll_peer_timeout_secs: u64,
    pub janitor_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub shutdown_deadline_secs: u64,
}

impl RelayConfig {
    pub fn from_env() -> Self {
        RelayConfig {
            port: env::var("RELAY_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3001),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            trusted_proxies: env_usize("TRUSTED_PROXIES", 0),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            rate_limit_window_secs: env_u64("RATE_LIMIT_WINDOW_SECS", 60),
            rate_limit_creates: env_u32("RATE_LIMIT_CREATES", 5),
            rate_limit_joins: env_u32("RATE_LIMIT_JOINS", 20),
            rate_limit_messages: env_u32("RATE_LIMIT_MESSAGES", 60),

            room_capacity: env_usize("ROOM_CAPACITY", 10_000),
            room_max_members: env_usize("ROOM_MAX_MEMBERS", 50),
            room_backlog_cap: env_usize("ROOM_BACKLOG_CAP", 200),

            poll_peer_timeout_secs: env_u64("POLL_PEER_TIMEOUT_SECS", 120),
            janitor_interval_secs: env_u64("JANITOR_INTERVAL_SECS", 10),
            heartbeat_interval_secs: env_u64("HEARTBEAT_INTERVAL_SECS", 30),
            shutdown_deadline_secs: env_u64("SHUTDOWN_DEADLINE_SECS", 5),
        }
    }

    /// Clamp a client-requested TTL (seconds) into the allowed range.
    pub fn clamp_ttl_secs(&self, requested: u64) -> u64 {
        requested.clamp(60, 86_400)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
