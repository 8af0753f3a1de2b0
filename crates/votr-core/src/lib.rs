//! Room logic for votr.
//!
//! Pure state and state transitions, no tasks and no I/O. The server crate
//! owns one [`RoomState`] per room inside a single task and feeds every
//! inbound message through [`MessageProcessor::process`], which either
//! produces the message to broadcast or a [`ProcessError`] explaining why
//! the message was dropped.
//!
//! # Components
//!
//! - [`Environment`]: randomness source (OS RNG in production, seeded in tests)
//! - [`RoomId`], [`SessionId`], [`Secret`]: identifiers
//! - [`VoteValue`]: the enumerated vote set
//! - [`RoomState`]: member set, per-member votes and the owner secret
//! - [`MessageProcessor`]: validation and transformation of inbound messages

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
mod error;
mod ids;
mod processor;
mod state;
mod vote;

pub use env::Environment;
pub use error::ProcessError;
pub use ids::{ID_ALPHABET, ROOM_ID_LEN, RoomId, SECRET_LEN, Secret, SessionId};
pub use processor::{Inbound, MessageProcessor, USER_CHANGED_VOTE, USER_ENTERED, USER_PLACED_VOTE};
pub use state::{Member, RoomState};
pub use vote::VoteValue;
