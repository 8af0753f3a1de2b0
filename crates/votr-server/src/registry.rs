//! Room registry.
//!
//! Maps room identifiers to running rooms. This map is the only state shared
//! between tasks outside a room's own loop, so it sits behind a tokio
//! `RwLock`; everything inside a room is reached through its queues.
//!
//! Rooms are created explicitly (by the gateway when a client arrives
//! without a room id) and are never removed.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::{RwLock, mpsc, oneshot};
use votr_core::{Environment, Inbound, RoomId, Secret};

use crate::{
    room::{Membership, Room, RoomHandle},
    session::MemberHandle,
};

/// Identifier generation attempts before giving up on a free room id.
const MAX_ID_ATTEMPTS: usize = 8;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No room with this id
    #[error("room \"{0}\" does not exist")]
    RoomNotFound(RoomId),

    /// Every generated id collided with an existing room
    #[error("room \"{0}\" already exists")]
    RoomAlreadyExists(RoomId),

    /// Room task is no longer running
    #[error("room \"{0}\" is closed")]
    RoomClosed(RoomId),
}

/// What a new member needs to talk to its room.
#[derive(Debug)]
pub struct RoomLink {
    /// Queue for the member's inbound messages
    pub incoming: mpsc::Sender<Inbound>,
    /// Queue for the member's eventual leave
    pub membership: mpsc::Sender<Membership>,
    /// Room secret, present only for the member that opened an empty room
    pub secret: Option<Secret>,
}

/// Totals across all rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Registered rooms
    pub rooms: usize,
    /// Members across all rooms
    pub members: usize,
}

/// Process-wide mapping from room id to running room.
#[derive(Debug)]
pub struct RoomRegistry<E> {
    env: E,
    queue_capacity: usize,
    rooms: RwLock<HashMap<RoomId, RoomHandle>>,
}

impl<E: Environment> RoomRegistry<E> {
    /// Empty registry. Rooms it starts get input queues of `queue_capacity`.
    pub fn new(env: E, queue_capacity: usize) -> Self {
        Self { env, queue_capacity, rooms: RwLock::new(HashMap::new()) }
    }

    /// Create a room with a fresh id and secret and start its task.
    ///
    /// Never overwrites an existing room: a colliding id is regenerated, and
    /// after repeated collisions the call fails.
    pub async fn create_room(&self) -> Result<RoomId, RegistryError> {
        let mut rooms = self.rooms.write().await;

        let mut id = RoomId::generate(&self.env);
        let mut attempts = 1;
        while rooms.contains_key(&id) {
            if attempts == MAX_ID_ATTEMPTS {
                return Err(RegistryError::RoomAlreadyExists(id));
            }
            id = RoomId::generate(&self.env);
            attempts += 1;
        }

        let handle = Room::spawn(id.clone(), Secret::generate(&self.env), self.queue_capacity);
        rooms.insert(id.clone(), handle);
        tracing::info!(room_id = %id, "Creating new room");

        Ok(id)
    }

    /// Whether a room with this id exists.
    pub async fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.read().await.contains_key(room_id)
    }

    /// Handle to a room, if it exists.
    pub async fn room(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Register `member` with a room.
    ///
    /// Returns once the room task has added the member, so the caller may
    /// start the member's pumps right after. The secret is included only when
    /// the room was empty before this member joined.
    pub async fn add_member(
        &self,
        member: MemberHandle,
        room_id: &RoomId,
    ) -> Result<RoomLink, RegistryError> {
        let room = self
            .room(room_id)
            .await
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.clone()))?;
        tracing::debug!(room_id = %room_id, session_id = %member.id(), "Adding user to room");

        let (reply, joined) = oneshot::channel();
        room.membership()
            .send(Membership::Join { member, reply })
            .await
            .map_err(|_| RegistryError::RoomClosed(room_id.clone()))?;
        let secret = joined.await.map_err(|_| RegistryError::RoomClosed(room_id.clone()))?;

        Ok(RoomLink {
            incoming: room.incoming().clone(),
            membership: room.membership().clone(),
            secret,
        })
    }

    /// Room and member totals.
    pub async fn stats(&self) -> RegistryStats {
        let rooms = self.rooms.read().await;
        RegistryStats {
            rooms: rooms.len(),
            members: rooms.values().map(RoomHandle::member_count).sum(),
        }
    }
}
