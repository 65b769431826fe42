//! Room Registry
//!
//! Process-local map from room id to the clients connected to that room.
//!
//! One mutex covers every room of a hub. Fan-out only queues frames with
//! `try_send`, so no socket write ever happens while the lock is held.
//!
//! Invariants:
//! - a room key exists iff its client list is non-empty
//! - a connection appears at most once per room
//! - a user appears at most once per room

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::client::{Client, Frame};
use crate::domain::RoomKind;

/// Result of [`RoomRegistry::join`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The client was added to the room.
    Joined,
    /// The same connection was already listed; nothing changed.
    AlreadyJoined,
    /// Another connection of the same user was evicted and closed.
    Replaced,
}

/// Per-call fan-out result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct RoomRegistry {
    kind: RoomKind,
    rooms: Mutex<HashMap<i64, Vec<Client>>>,
}

impl RoomRegistry {
    pub fn new(kind: RoomKind) -> Self {
        Self {
            kind,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Add `client` to `room_id`, creating the room if needed.
    pub fn join(&self, room_id: i64, client: Client) -> JoinOutcome {
        let mut rooms = self.rooms.lock();
        let clients = rooms.entry(room_id).or_default();

        let outcome = if clients.iter().any(|c| c.is_same_connection(&client)) {
            JoinOutcome::AlreadyJoined
        } else if let Some(existing) = clients.iter_mut().find(|c| c.user_id == client.user_id) {
            let evicted = std::mem::replace(existing, client);
            evicted.close();
            warn!(
                room_kind = %self.kind,
                room_id = room_id,
                user_id = evicted.user_id,
                connection_id = %evicted.connection_id,
                "Evicted older connection of the same user"
            );
            JoinOutcome::Replaced
        } else {
            clients.push(client);
            JoinOutcome::Joined
        };

        log_room(self.kind, room_id, rooms.get(&room_id));
        outcome
    }

    /// Remove the entry of `user_id` from `room_id`.
    pub fn leave(&self, room_id: i64, user_id: i64) -> Option<Client> {
        self.remove_where(room_id, |c| c.user_id == user_id)
    }

    /// Remove one specific connection from `room_id`.
    ///
    /// Unlike [`leave`](Self::leave) this never touches a newer connection
    /// of the same user that replaced this one.
    pub fn remove(&self, room_id: i64, connection_id: Uuid) -> Option<Client> {
        self.remove_where(room_id, |c| c.connection_id == connection_id)
    }

    /// Remove a connection from every room it is listed in.
    pub fn remove_everywhere(&self, connection_id: Uuid) -> usize {
        let mut rooms = self.rooms.lock();
        let mut removed = 0;
        rooms.retain(|_, clients| {
            let before = clients.len();
            clients.retain(|c| c.connection_id != connection_id);
            removed += before - clients.len();
            !clients.is_empty()
        });
        removed
    }

    fn remove_where(&self, room_id: i64, matches: impl Fn(&Client) -> bool) -> Option<Client> {
        let mut rooms = self.rooms.lock();
        let clients = rooms.get_mut(&room_id)?;

        let removed = clients
            .iter()
            .position(|c| matches(c))
            .map(|index| clients.remove(index));
        if clients.is_empty() {
            rooms.remove(&room_id);
        }

        if let Some(client) = &removed {
            debug!(
                room_kind = %self.kind,
                room_id = room_id,
                user_id = client.user_id,
                connection_id = %client.connection_id,
                "Client left room"
            );
            log_room(self.kind, room_id, rooms.get(&room_id));
        }
        removed
    }

    /// Queue `frame` for every client of `room_id`.
    ///
    /// Clients whose queue is full or closed are removed from the room and
    /// closed; the remaining clients still receive the frame.
    pub fn fanout(&self, room_id: i64, frame: &Frame) -> FanoutReport {
        let mut rooms = self.rooms.lock();
        let Some(clients) = rooms.get_mut(&room_id) else {
            return FanoutReport::default();
        };

        let mut report = FanoutReport::default();
        clients.retain(|client| match client.try_deliver(frame.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(e) => {
                warn!(
                    room_kind = %self.kind,
                    room_id = room_id,
                    user_id = client.user_id,
                    connection_id = %client.connection_id,
                    error = %e,
                    "Dropping client after failed write"
                );
                client.close();
                report.failed += 1;
                false
            }
        });

        if clients.is_empty() {
            rooms.remove(&room_id);
        }
        report
    }

    /// Number of non-empty rooms.
    pub fn size(&self) -> usize {
        self.rooms.lock().len()
    }

    pub fn room_len(&self, room_id: i64) -> usize {
        self.rooms.lock().get(&room_id).map_or(0, Vec::len)
    }

    pub fn contains(&self, room_id: i64, connection_id: Uuid) -> bool {
        self.rooms
            .lock()
            .get(&room_id)
            .is_some_and(|clients| clients.iter().any(|c| c.connection_id == connection_id))
    }

    /// Total number of registry entries across all rooms.
    pub fn entry_count(&self) -> usize {
        self.rooms.lock().values().map(Vec::len).sum()
    }
}

fn log_room(kind: RoomKind, room_id: i64, clients: Option<&Vec<Client>>) {
    let members: Vec<i64> = clients
        .map(|clients| clients.iter().map(|c| c.user_id).collect())
        .unwrap_or_default();
    debug!(room_kind = %kind, room_id = room_id, members = ?members, "Room membership");
}
