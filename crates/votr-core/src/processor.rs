//! Message processing for a single room.
//!
//! `MessageProcessor::process` maps an inbound message plus the room state to
//! the message that should be broadcast, or to the reason nothing should be.
//! It runs only on the room's own task, so it never locks.
//!
//! Validation order:
//! 1. Privileged kinds must carry the room secret.
//! 2. Dispatch on kind: `Vote` validates and records the vote, `Status`
//!    passes through, `Reveal` requires a finished round, anything else is
//!    rejected.

use votr_proto::{Message, MessageKind};

use crate::{error::ProcessError, ids::SessionId, state::RoomState, vote::VoteValue};

/// Status text broadcast when a member votes for the first time in a round.
pub const USER_PLACED_VOTE: &str = "User placed his vote.";

/// Status text broadcast when a member changes its vote.
pub const USER_CHANGED_VOTE: &str = "User changed his vote.";

/// Status text announced when a member joins.
pub const USER_ENTERED: &str = "New user entered room.";

/// A message paired with the session that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Sender of the message
    pub origin: SessionId,
    /// Decoded message
    pub message: Message,
}

impl Inbound {
    /// Pair `message` with its sender.
    pub fn new(origin: SessionId, message: Message) -> Self {
        Self { origin, message }
    }
}

/// State-transition function of a room.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageProcessor;

impl MessageProcessor {
    /// Validate `inbound` against `state`, apply its effect, and return the
    /// message to broadcast.
    ///
    /// The returned message has no counts; the caller stamps it with
    /// [`RoomState::stamp`] right before fan-out. On error the state is
    /// unchanged.
    pub fn process<H>(
        state: &mut RoomState<H>,
        inbound: &Inbound,
    ) -> Result<Message, ProcessError> {
        let message = &inbound.message;

        if message.kind.is_privileged() && !state.secret().matches(message.secret.as_deref()) {
            return Err(ProcessError::Unauthorized {
                kind: message.kind.code(),
                secret: message.secret.clone(),
            });
        }

        match message.kind {
            MessageKind::Vote => Self::vote(state, inbound.origin, &message.value),
            MessageKind::Status => Ok(Message::status(message.value.clone())),
            MessageKind::Reveal => Self::reveal(state),
            MessageKind::Ignore | MessageKind::Unknown(_) => {
                Err(ProcessError::UnknownMessageKind(message.kind.code()))
            },
        }
    }

    fn vote<H>(
        state: &mut RoomState<H>,
        origin: SessionId,
        raw: &str,
    ) -> Result<Message, ProcessError> {
        let vote: VoteValue = raw.parse()?;
        let member = state.member_mut(origin).ok_or(ProcessError::UnknownMember(origin))?;

        let text = match member.vote() {
            Some(current) if current == vote => return Err(ProcessError::NoOpVote(vote)),
            Some(_) => USER_CHANGED_VOTE,
            None => USER_PLACED_VOTE,
        };

        tracing::debug!(session_id = %origin, %vote, "Vote recorded");
        member.set_vote(Some(vote));
        Ok(Message::status(text))
    }

    fn reveal<H>(state: &mut RoomState<H>) -> Result<Message, ProcessError> {
        if !state.is_done() {
            return Err(ProcessError::VotingIncomplete {
                voted: state.count_votes(),
                members: state.member_count(),
            });
        }

        let mut votes = Vec::with_capacity(state.member_count());
        for member in state.members_mut() {
            if let Some(vote) = member.vote() {
                votes.push(vote.to_string());
            }
            member.set_vote(None);
        }

        Ok(Message::reveal(votes.join(", ")))
    }
}
