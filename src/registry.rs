use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::ids;
use crate::models::CreateRoomResponse;
use crate::room::{PushSender, Room};

/// A room behind its own lock, shared between the registry and whichever
/// connection handlers are currently touching it.
pub type RoomHandle = Arc<Mutex<Room>>;

/// The global keyed store of live rooms. Enforces the global capacity cap
/// and per-hash uniqueness; all other room behavior is owned by `Room`
/// itself.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, RoomHandle>>,
    capacity: usize,
    max_members: usize,
    backlog_cap: usize,
}

impl RoomRegistry {
    pub fn from_config(config: &RelayConfig) -> Self {
        RoomRegistry {
            rooms: Mutex::new(HashMap::new()),
            capacity: config.room_capacity,
            max_members: config.room_max_members,
            backlog_cap: config.room_backlog_cap,
        }
    }

    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Creates and inserts a new room, atomically with the registry's
    /// capacity and uniqueness checks.
    pub async fn create(
        &self,
        room_hash: String,
        ttl_secs: u64,
        creator_push: Option<PushSender>,
    ) -> Result<(CreateRoomResponse, RoomHandle), RelayError> {
        let mut rooms = self.rooms.lock().await;
        if rooms.len() >= self.capacity {
            return Err(RelayError::CapacityExceeded);
        }
        if rooms.contains_key(&room_hash) {
            // Generic error: indistinguishable from not-found, to prevent
            // enumeration of live hashes.
            return Err(RelayError::RoomError);
        }

        let peer_id = ids::new_peer_id();
        let (room, delete_token) = Room::new(
            room_hash.clone(),
            ttl_secs,
            self.max_members,
            self.backlog_cap,
            peer_id.clone(),
            creator_push,
        );
        let peer_count = room.peer_count();
        let handle: RoomHandle = Arc::new(Mutex::new(room));
        rooms.insert(room_hash.clone(), handle.clone());

        Ok((
            CreateRoomResponse {
                room_hash,
                peer_id,
                delete_token,
                peer_count,
            },
            handle,
        ))
    }

    pub async fn lookup(&self, room_hash: &str) -> Option<RoomHandle> {
        self.rooms.lock().await.get(room_hash).cloned()
    }

    /// Removes a room from the registry unconditionally. Idempotent.
    pub async fn destroy(&self, room_hash: &str) -> Option<RoomHandle> {
        self.rooms.lock().await.remove(room_hash)
    }

    /// Removes `room_hash` only if its handle is still empty, avoiding a
    /// race against a concurrent join that filled the room after the caller
    /// observed it empty.
    pub async fn destroy_if_empty(&self, room_hash: &str) -> bool {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(room_hash) {
            let room = handle.lock().await;
            if room.is_empty() {
                drop(room);
                rooms.remove(room_hash);
                return true;
            }
        }
        false
    }

    /// Snapshot of every `(hash, handle)` pair, used by the Janitor sweeps.
    pub async fn snapshot(&self) -> Vec<(String, RoomHandle)> {
        self.rooms
            .lock()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Totals across every live room: (push members, poll members).
    /// Used by the health endpoint.
    pub async fn member_totals(&self) -> (usize, usize) {
        let handles: Vec<RoomHandle> = self.rooms.lock().await.values().cloned().collect();
        let mut ws = 0;
        let mut http = 0;
        for handle in handles {
            let room = handle.lock().await;
            ws += room.push_count();
            http += room.poll_count();
        }
        (ws, http)
    }
}
