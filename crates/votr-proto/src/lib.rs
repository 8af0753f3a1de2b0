//! Wire protocol for votr rooms.
//!
//! Every frame exchanged with a client is a single JSON object:
//!
//! ```text
//! {"type": 0, "value": "5", "userCount": 2, "voteCount": 1, "secret": "..."}
//! ```
//!
//! The `type` field selects a [`MessageKind`]. Counts are only meaningful on
//! outbound broadcasts; inbound counts are accepted and ignored. The `secret`
//! field is carried on privileged inbound messages and on the single private
//! message that hands the owner its secret at join time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod errors;
mod message;

pub use errors::{ProtocolError, Result};
pub use message::{Message, MessageKind, PRIVILEGED_THRESHOLD};
