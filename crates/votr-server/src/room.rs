//! Room actor.
//!
//! Each room runs as one tokio task that owns its [`RoomState`]. Everything
//! that reads or changes membership, votes or the secret happens on that
//! task, fed by two queues:
//!
//! - `incoming`: messages from every member's read pump
//! - `membership`: joins from the gateway and leaves from read pumps
//!
//! Messages for one room are therefore processed strictly one at a time.
//! Membership changes are taken first. A leave drains `incoming` before it
//! is applied, so a member's messages are never overtaken by its own leave.
//! Rooms share nothing, so different rooms run fully in parallel.
//!
//! Two behaviours are intentional simplifications:
//!
//! - a member leaving produces no broadcast (no "user left" status);
//! - a room is never torn down, even when its last member leaves. Its task
//!   and registry entry live until the process exits.

use tokio::sync::{mpsc, oneshot, watch};
use votr_core::{Inbound, MessageProcessor, ProcessError, RoomId, RoomState, Secret, SessionId};
use votr_proto::Message;

use crate::session::{DeliveryError, MemberHandle};

/// Status text of the private message that hands the owner its secret.
pub const OWNER_GREETING: &str = "You own this room.";

/// Membership change requests, processed in order with messages.
#[derive(Debug)]
pub enum Membership {
    /// Add a member. The reply carries the room secret when the member is
    /// the first to join an empty room.
    Join {
        /// Member to add
        member: MemberHandle,
        /// Where to report ownership
        reply: oneshot::Sender<Option<Secret>>,
    },

    /// Remove a member and close its connection.
    Leave(SessionId),
}

/// Cloneable handle to a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    incoming: mpsc::Sender<Inbound>,
    membership: mpsc::Sender<Membership>,
    members: watch::Receiver<usize>,
}

impl RoomHandle {
    /// Queue feeding the room's message processing.
    pub fn incoming(&self) -> &mpsc::Sender<Inbound> {
        &self.incoming
    }

    /// Queue feeding the room's membership changes.
    pub fn membership(&self) -> &mpsc::Sender<Membership> {
        &self.membership
    }

    /// Member count as last published by the room task.
    pub fn member_count(&self) -> usize {
        *self.members.borrow()
    }

    /// Whether the room task has stopped.
    pub fn is_closed(&self) -> bool {
        self.incoming.is_closed()
    }
}

/// The room task.
pub struct Room {
    id: RoomId,
    state: RoomState<MemberHandle>,
    incoming: mpsc::Receiver<Inbound>,
    membership: mpsc::Receiver<Membership>,
    members: watch::Sender<usize>,
}

impl Room {
    /// Start a room task and return its handle.
    ///
    /// `queue_capacity` bounds both input queues; producers wait when the
    /// room falls behind.
    pub fn spawn(id: RoomId, secret: Secret, queue_capacity: usize) -> RoomHandle {
        let (incoming_tx, incoming) = mpsc::channel(queue_capacity.max(1));
        let (membership_tx, membership) = mpsc::channel(queue_capacity.max(1));
        let (members, members_rx) = watch::channel(0);

        let room = Self { id, state: RoomState::new(secret), incoming, membership, members };
        tokio::spawn(room.run());

        RoomHandle { incoming: incoming_tx, membership: membership_tx, members: members_rx }
    }

    async fn run(mut self) {
        tracing::debug!(room_id = %self.id, "Room started");

        loop {
            tokio::select! {
                biased;

                Some(change) = self.membership.recv() => self.apply(change),
                Some(inbound) = self.incoming.recv() => self.handle(&inbound),
                else => break,
            }
        }

        tracing::debug!(room_id = %self.id, "Room stopped");
    }

    fn apply(&mut self, change: Membership) {
        match change {
            Membership::Join { member, reply } => {
                let id = member.id();
                let secret = self.state.join(id, member);

                if let Some(secret) = &secret {
                    let greeting = self
                        .state
                        .stamp(Message::status(OWNER_GREETING))
                        .with_secret(secret.expose());
                    self.send_to(id, greeting);
                }

                tracing::info!(
                    room_id = %self.id,
                    session_id = %id,
                    owner = secret.is_some(),
                    members = self.state.member_count(),
                    "Member joined"
                );
                self.publish_count();
                let _ = reply.send(secret);
            },
            Membership::Leave(id) => {
                // The read pump queues all of a member's messages before its
                // leave, so anything still in `incoming` precedes it.
                self.drain_incoming();

                // Dropping the handle closes the delivery channel, which makes
                // the write pump close the connection.
                if self.state.leave(id).is_some() {
                    tracing::info!(
                        room_id = %self.id,
                        session_id = %id,
                        members = self.state.member_count(),
                        "Member left"
                    );
                    self.publish_count();
                }
            },
        }
    }

    fn drain_incoming(&mut self) {
        while let Ok(inbound) = self.incoming.try_recv() {
            self.handle(&inbound);
        }
    }

    fn handle(&mut self, inbound: &Inbound) {
        match MessageProcessor::process(&mut self.state, inbound) {
            Ok(outbound) => self.broadcast(&self.state.stamp(outbound)),
            Err(e @ ProcessError::Unauthorized { .. }) => {
                tracing::warn!(
                    room_id = %self.id,
                    session_id = %inbound.origin,
                    "Processing message error: {}",
                    e
                );
            },
            Err(e) => {
                tracing::debug!(
                    room_id = %self.id,
                    session_id = %inbound.origin,
                    "Processing message error: {}",
                    e
                );
            },
        }
    }

    fn broadcast(&self, message: &Message) {
        for (id, member) in self.state.members() {
            self.report(id, member.handle.deliver(message.clone()));
        }
    }

    fn send_to(&self, id: SessionId, message: Message) {
        if let Some(member) = self.state.member(id) {
            self.report(id, member.handle.deliver(message));
        }
    }

    fn report(&self, id: SessionId, result: Result<(), DeliveryError>) {
        match result {
            Ok(()) => {},
            Err(DeliveryError::Full) => {
                tracing::warn!(
                    room_id = %self.id,
                    session_id = %id,
                    "Member is lagging, message dropped"
                );
            },
            // Its read pump will report the leave.
            Err(DeliveryError::Closed) => {
                tracing::debug!(room_id = %self.id, session_id = %id, "Member delivery closed");
            },
        }
    }

    fn publish_count(&self) {
        self.members.send_replace(self.state.member_count());
    }
}
