//! Room state: member set, votes and the owner secret.
//!
//! A `RoomState` belongs to exactly one task. Nothing here locks; callers get
//! serialization by never sharing the value.

use std::collections::HashMap;

use votr_proto::Message;

use crate::{
    ids::{Secret, SessionId},
    vote::VoteValue,
};

/// One member of a room.
///
/// `H` is whatever the runtime needs to reach the member (a delivery channel
/// in the server, `()` in tests).
#[derive(Debug)]
pub struct Member<H> {
    /// Delivery handle for outbound messages
    pub handle: H,
    vote: Option<VoteValue>,
}

impl<H> Member<H> {
    /// Member that has not voted yet.
    pub fn new(handle: H) -> Self {
        Self { handle, vote: None }
    }

    /// Current vote, `None` until the member votes in this round.
    pub fn vote(&self) -> Option<VoteValue> {
        self.vote
    }

    pub(crate) fn set_vote(&mut self, vote: Option<VoteValue>) {
        self.vote = vote;
    }
}

/// Authoritative state of one room.
///
/// # Invariants
///
/// - `count_votes() <= member_count()`
/// - `is_done()` iff `count_votes() == member_count()`
#[derive(Debug)]
pub struct RoomState<H> {
    secret: Secret,
    members: HashMap<SessionId, Member<H>>,
}

impl<H> RoomState<H> {
    /// Empty room guarded by `secret`.
    pub fn new(secret: Secret) -> Self {
        Self { secret, members: HashMap::new() }
    }

    /// Room secret.
    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Add a member.
    ///
    /// Returns the room secret when the room was empty before this call: the
    /// first member to join an empty room becomes its owner. Joining again
    /// with an existing id replaces that member and resets its vote.
    pub fn join(&mut self, id: SessionId, handle: H) -> Option<Secret> {
        let owner = self.members.is_empty();
        self.members.insert(id, Member::new(handle));
        owner.then(|| self.secret.clone())
    }

    /// Remove a member, handing back its delivery handle.
    pub fn leave(&mut self, id: SessionId) -> Option<H> {
        self.members.remove(&id).map(|m| m.handle)
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: SessionId) -> bool {
        self.members.contains_key(&id)
    }

    /// Member by id.
    pub fn member(&self, id: SessionId) -> Option<&Member<H>> {
        self.members.get(&id)
    }

    pub(crate) fn member_mut(&mut self, id: SessionId) -> Option<&mut Member<H>> {
        self.members.get_mut(&id)
    }

    /// Iterate over members in no particular order.
    pub fn members(&self) -> impl Iterator<Item = (SessionId, &Member<H>)> {
        self.members.iter().map(|(id, m)| (*id, m))
    }

    pub(crate) fn members_mut(&mut self) -> impl Iterator<Item = &mut Member<H>> {
        self.members.values_mut()
    }

    /// Number of members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Number of members holding a vote in the current round.
    pub fn count_votes(&self) -> usize {
        self.members.values().filter(|m| m.vote.is_some()).count()
    }

    /// Whether every member has voted. Trivially true for an empty room.
    pub fn is_done(&self) -> bool {
        self.members.values().all(|m| m.vote.is_some())
    }

    /// Prepare `message` for broadcast: current counts, never a secret.
    pub fn stamp(&self, mut message: Message) -> Message {
        message.user_count = self.member_count();
        message.vote_count = self.count_votes();
        message.secret = None;
        message
    }
}
