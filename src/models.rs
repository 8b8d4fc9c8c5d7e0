use serde::{Deserialize, Serialize};

/// An opaque, end-to-end-encrypted message record. The relay never
/// interprets `payload` or `nonce`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Envelope {
    pub room: String,
    pub from: String,
    pub payload: String,
    pub nonce: String,
    pub ts: i64,
}

impl Envelope {
    /// Structural validity check: all fields present, `payload`/`nonce`
    /// non-empty. Does not check membership.
    pub fn is_structurally_valid(&self) -> bool {
        !self.room.is_empty()
            && !self.from.is_empty()
            && !self.payload.is_empty()
            && !self.nonce.is_empty()
    }
}

// --- Poll transport request/response bodies ---

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(rename = "roomHash")]
    pub room_hash: String,
    pub ttl: u64,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    #[serde(rename = "roomHash")]
    pub room_hash: String,
    #[serde(rename = "peerId")]
    pub peer_id: String,
    #[serde(rename = "deleteToken")]
    pub delete_token: String,
    #[serde(rename = "peerCount")]
    pub peer_count: usize,
}

#[derive(Debug, Serialize)]
pub struct JoinRoomResponse {
    #[serde(rename = "roomHash")]
    pub room_hash: String,
    #[serde(rename = "peerId")]
    pub peer_id: String,
    #[serde(rename = "peerCount")]
    pub peer_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SendEnvelopeRequest {
    #[serde(rename = "peerId")]
    pub peer_id: String,
    pub envelope: Envelope,
}

#[derive(Debug, Serialize)]
pub struct SendEnvelopeResponse {
    pub sent: bool,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub messages: Vec<Envelope>,
    #[serde(rename = "peerCount")]
    pub peer_count: usize,
    #[serde(rename = "roomHash")]
    pub room_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaveRequest {
    #[serde(rename = "peerId")]
    pub peer_id: String,
}

#[derive(Debug, Serialize)]
pub struct LeaveResponse {
    pub left: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthPeers {
    pub ws: usize,
    pub http: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthMemory {
    pub rss: u64,
    pub heap: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthLimits {
    #[serde(rename = "roomCapacity")]
    pub room_capacity: usize,
    #[serde(rename = "roomMaxMembers")]
    pub room_max_members: usize,
    #[serde(rename = "roomBacklogCap")]
    pub room_backlog_cap: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime: u64,
    pub rooms: usize,
    pub peers: HealthPeers,
    pub memory: HealthMemory,
    pub limits: HealthLimits,
}

// --- Push transport events ---

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    CreateRoom {
        #[serde(rename = "roomHash")]
        room_hash: String,
        ttl: u64,
    },
    JoinRoom {
        #[serde(rename = "roomHash")]
        room_hash: String,
    },
    LeaveRoom {
        #[serde(rename = "roomHash")]
        room_hash: String,
    },
    DeleteRoom {
        #[serde(rename = "roomHash")]
        room_hash: String,
        #[serde(rename = "deleteToken")]
        delete_token: String,
    },
    Message {
        envelope: Envelope,
    },
    Ping,
}

#[derive(Debug, Serialize, Clone)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    RoomCreated {
        #[serde(rename = "roomHash")]
        room_hash: String,
        #[serde(rename = "peerId")]
        peer_id: String,
        #[serde(rename = "deleteToken")]
        delete_token: String,
    },
    RoomJoined {
        #[serde(rename = "roomHash")]
        room_hash: String,
        #[serde(rename = "peerId")]
        peer_id: String,
        #[serde(rename = "peerCount")]
        peer_count: usize,
    },
    PeerJoined {
        #[serde(rename = "roomHash")]
        room_hash: String,
        #[serde(rename = "peerId")]
        peer_id: String,
        #[serde(rename = "peerCount")]
        peer_count: usize,
    },
    PeerLeft {
        #[serde(rename = "roomHash")]
        room_hash: String,
        #[serde(rename = "peerId")]
        peer_id: String,
        #[serde(rename = "peerCount")]
        peer_count: usize,
    },
    Message {
        envelope: Envelope,
    },
    RoomExpired {
        #[serde(rename = "roomHash")]
        room_hash: String,
    },
    RoomDeleted {
        #[serde(rename = "roomHash")]
        room_hash: String,
    },
    Error {
        message: String,
        code: String,
        #[serde(rename = "roomHash", skip_serializing_if = "Option::is_none")]
        room_hash: Option<String>,
    },
    Pong,
}

impl ServerEvent {
    pub fn error(err: &crate::error::RelayError, room_hash: Option<String>) -> Self {
        ServerEvent::Error {
            message: err.to_string(),
            code: err.code().to_string(),
            room_hash,
        }
    }
}
