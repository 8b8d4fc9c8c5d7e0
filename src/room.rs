use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::error::RelayError;
use crate::ids;
use crate::models::{Envelope, ServerEvent};

/// Outbound channel to a single push connection. `None` entries are never
/// stored; a peer without a live push connection is a poll member instead.
pub type PushSender = mpsc::UnboundedSender<ServerEvent>;

/// The state machine for one room. Owned by the registry behind a per-room
/// lock so that membership, backlog, and lifecycle transitions are
/// serialized with respect to each other.
pub struct Room {
    pub hash: String,
    delete_token: String,
    created_at: Instant,
    ttl: Duration,
    max_members: usize,
    backlog_cap: usize,
    push_members: HashMap<String, PushSender>,
    poll_members: HashMap<String, Instant>,
    backlog: VecDeque<Envelope>,
}

/// Result of a transition that changes membership, used by callers to decide
/// whether the room must now be destroyed and who to notify.
pub struct MembershipChange {
    pub peer_count: usize,
    pub now_empty: bool,
}

impl Room {
    /// Creates a room with its creator already a member. Returns the room and
    /// the delete token (disclosed exactly once, to the creator).
    pub fn new(
        hash: String,
        ttl_secs: u64,
        max_members: usize,
        backlog_cap: usize,
        creator_peer_id: String,
        creator_push: Option<PushSender>,
    ) -> (Self, String) {
        let delete_token = ids::new_delete_token();
        let mut room = Room {
            hash,
            delete_token: delete_token.clone(),
            created_at: Instant::now(),
            ttl: Duration::from_secs(ttl_secs),
            max_members,
            backlog_cap,
            push_members: HashMap::new(),
            poll_members: HashMap::new(),
            backlog: VecDeque::new(),
        };
        match creator_push {
            Some(tx) => {
                room.push_members.insert(creator_peer_id, tx);
            }
            None => {
                room.poll_members.insert(creator_peer_id, Instant::now());
            }
        }
        (room, delete_token)
    }

    pub fn peer_count(&self) -> usize {
        self.push_members.len() + self.poll_members.len()
    }

    pub fn push_count(&self) -> usize {
        self.push_members.len()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peer_count() == 0
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    pub fn is_member(&self, peer_id: &str) -> bool {
        self.push_members.contains_key(peer_id) || self.poll_members.contains_key(peer_id)
    }

    /// Constant-time comparison of a presented delete token against the
    /// room's own, so mismatches don't leak timing information about how
    /// many leading bytes matched.
    pub fn token_matches(&self, presented: &str) -> bool {
        let a = self.delete_token.as_bytes();
        let b = presented.as_bytes();
        if a.len() != b.len() {
            return false;
        }
        let mut diff = 0u8;
        for (x, y) in a.iter().zip(b.iter()) {
            diff |= x ^ y;
        }
        diff == 0
    }

    pub fn join(
        &mut self,
        peer_id: String,
        push: Option<PushSender>,
    ) -> Result<MembershipChange, RelayError> {
        if self.peer_count() >= self.max_members {
            return Err(RelayError::RoomFull);
        }
        match push {
            Some(tx) => {
                self.push_members.insert(peer_id, tx);
            }
            None => {
                self.poll_members.insert(peer_id, Instant::now());
            }
        }
        Ok(MembershipChange {
            peer_count: self.peer_count(),
            now_empty: false,
        })
    }

    /// Removes a member regardless of transport. No-op (generic error) if the
    /// peer is not present.
    pub fn leave(&mut self, peer_id: &str) -> Result<MembershipChange, RelayError> {
        let was_push = self.push_members.remove(peer_id).is_some();
        let was_poll = if !was_push {
            self.poll_members.remove(peer_id).is_some()
        } else {
            false
        };
        if !was_push && !was_poll {
            return Err(RelayError::RoomError);
        }
        Ok(MembershipChange {
            peer_count: self.peer_count(),
            now_empty: self.is_empty(),
        })
    }

    /// Accepts a message from `sender_peer_id`, appends to the backlog, and
    /// returns the set of push connections to fan out to (self-excluded).
    pub fn accept_message(
        &mut self,
        sender_peer_id: &str,
        envelope: Envelope,
    ) -> Result<Vec<PushSender>, RelayError> {
        if !self.is_member(sender_peer_id) {
            return Err(RelayError::NotInRoom);
        }
        self.backlog.push_back(envelope);
        while self.backlog.len() > self.backlog_cap {
            self.backlog.pop_front();
        }
        let targets = self
            .push_members
            .iter()
            .filter(|(peer, _)| peer.as_str() != sender_peer_id)
            .map(|(_, tx)| tx.clone())
            .collect();
        Ok(targets)
    }

    /// Envelopes with `ts` strictly greater than `since`, in backlog order.
    pub fn poll_since(&self, since: i64) -> Vec<Envelope> {
        self.backlog
            .iter()
            .filter(|e| e.ts > since)
            .cloned()
            .collect()
    }

    /// Refreshes a poll member's last-seen timestamp. Errors if the peer is
    /// not a current poll member of this room.
    pub fn touch_poll_peer(&mut self, peer_id: &str) -> Result<(), RelayError> {
        match self.poll_members.get_mut(peer_id) {
            Some(last_seen) => {
                *last_seen = Instant::now();
                Ok(())
            }
            None => Err(RelayError::RoomError),
        }
    }

    /// Evicts poll members idle longer than `timeout`. Returns the evicted
    /// peer ids so the caller can fan out `peer_left`.
    pub fn evict_idle_poll_peers(&mut self, timeout: Duration) -> Vec<String> {
        let now = Instant::now();
        let stale: Vec<String> = self
            .poll_members
            .iter()
            .filter(|(_, last_seen)| now.duration_since(**last_seen) > timeout)
            .map(|(peer, _)| peer.clone())
            .collect();
        for peer in &stale {
            self.poll_members.remove(peer);
        }
        stale
    }

    /// All current push connections, used when destroying a room to notify
    /// and close every push member.
    pub fn all_push_senders(&self) -> Vec<PushSender> {
        self.push_members.values().cloned().collect()
    }

    /// All current push connections except one peer's own, used for
    /// `peer_joined` fan-out (the joiner gets `room_joined` instead).
    pub fn all_push_senders_excluding(&self, peer_id: &str) -> Vec<PushSender> {
        self.push_members
            .iter()
            .filter(|(peer, _)| peer.as_str() != peer_id)
            .map(|(_, tx)| tx.clone())
            .collect()
    }

    pub fn remove_push_member(&mut self, peer_id: &str) -> bool {
        self.push_members.remove(peer_id).is_some()
    }
}
