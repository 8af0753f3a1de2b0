//! Processing errors.
//!
//! Every variant is local to one inbound message. The room logs it, drops the
//! message and keeps running; none of them disconnects the sender.

use thiserror::Error;

use crate::{ids::SessionId, vote::VoteValue};

/// Reasons an inbound message produces no broadcast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Privileged message without the room secret
    #[error("unprivileged call to kind {kind} with secret {secret:?}")]
    Unauthorized {
        /// Wire code of the rejected message
        kind: i64,
        /// Secret the sender presented, if any
        secret: Option<String>,
    },

    /// Vote outside the enumerated set
    #[error("invalid vote value: {0:?}")]
    InvalidVoteValue(String),

    /// Member voted for the value it already holds
    #[error("vote unchanged: {0}")]
    NoOpVote(VoteValue),

    /// Reveal requested before every member voted
    #[error("voting not complete: {voted} of {members} votes placed")]
    VotingIncomplete {
        /// Members holding a vote
        voted: usize,
        /// Members in the room
        members: usize,
    },

    /// Kind the room does not handle
    #[error("unknown message kind: {0}")]
    UnknownMessageKind(i64),

    /// Originator is not (or no longer) a member of the room
    #[error("session {0} is not a member of this room")]
    UnknownMember(SessionId),
}
