//! Error types for the nanomesh routing sockets.

use thiserror::Error;

use crate::distributor::RegistrationStage;
use crate::identity::PipeId;
use crate::message::Message;
use crate::socket::Protocol;

/// Socket-level errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Routing header is neither empty nor exactly one identity token wide
    /// ([`TOKEN_SIZE`](crate::TOKEN_SIZE) bytes)
    #[error("malformed routing header: expected 0 or 8 bytes, got {0}")]
    MalformedHeader(usize),

    /// Application supplied a routing header on a cooked socket
    #[error("routing header not permitted on a cooked socket")]
    HeaderNotPermitted,

    /// Pipe announced a receive priority outside `1..=16`
    #[error("receive priority {0} outside 1..=16")]
    InvalidPriority(u8),

    /// Lifecycle event for a pipe that is not attached
    #[error("unknown pipe: {0}")]
    UnknownPipe(PipeId),

    /// Identity token could not be resolved
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Set-once option was set a second time
    #[error("option already set: {0}")]
    OptionAlreadySet(&'static str),

    /// Peer speaks a protocol this socket does not pair with
    #[error("{local} socket cannot pair with {remote}")]
    IncompatiblePeer {
        /// Protocol of this socket
        local: Protocol,
        /// Protocol of the peer
        remote: Protocol,
    },
}

impl Error {
    /// Check whether the error is caused by caller input (`EINVAL` class)
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::MalformedHeader(_)
                | Self::HeaderNotPermitted
                | Self::InvalidPriority(_)
                | Self::OptionAlreadySet(_)
                | Self::IncompatiblePeer { .. }
        )
    }
}

/// Identity token decoding errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    /// Token is not exactly [`TOKEN_SIZE`](crate::TOKEN_SIZE) bytes
    #[error("token must be 8 bytes, got {0}")]
    Length(usize),

    /// Token names a slot that was never allocated
    #[error("no pipe for token {0}")]
    Unknown(PipeId),

    /// Token names a slot that has since been released or reused
    #[error("stale token {0}")]
    Stale(PipeId),
}

/// Registration stage errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StageError {
    /// Transition not allowed from the current stage
    #[error("invalid stage transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Stage the record was in
        from: RegistrationStage,
        /// Stage that was requested
        to: RegistrationStage,
    },
}

/// A rejected send; the message is handed back unconsumed
#[derive(Debug, Error)]
#[error("send rejected: {error}")]
pub struct SendError {
    /// Why the message was rejected
    pub error: Error,
    /// The message, untouched
    pub message: Message,
}

impl SendError {
    /// Create a send error carrying the rejected message
    pub fn new(error: Error, message: Message) -> Self {
        Self { error, message }
    }

    /// Recover the rejected message
    pub fn into_message(self) -> Message {
        self.message
    }
}
