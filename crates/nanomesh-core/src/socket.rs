//! The socket contract offered to the transport framework.

use std::fmt;

use crate::error::{Error, SendError};
use crate::identity::PipeId;
use crate::message::Message;
use crate::options::SocketOption;
use crate::pipe::Pipe;

/// Scalability protocol identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protocol(pub u16);

impl Protocol {
    /// The routing protocol
    pub const ROUTER: Self = Self(0x70);
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ROUTER => write!(f, "router"),
            Self(other) => write!(f, "protocol({other:#x})"),
        }
    }
}

/// Which layer of a protocol a socket exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Application-facing; routing headers are hidden
    Cooked,
    /// Device-facing; routing headers are visible
    Raw,
}

/// Readiness reported to the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Events {
    /// A receive would return a message
    pub readable: bool,
    /// A send would be accepted
    pub writable: bool,
}

/// Operations the framework invokes on a socket
///
/// The framework serializes every call on one socket; nothing here blocks.
pub trait Socket<P: Pipe> {
    /// Protocol implemented by the socket
    fn protocol(&self) -> Protocol;

    /// Layer the socket exposes
    fn domain(&self) -> Domain;

    /// Check whether a peer speaking `protocol` may connect
    fn accepts_peer(&self, protocol: Protocol) -> bool {
        protocol == self.protocol()
    }

    /// Register a new pipe
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPriority`] if the pipe's receive priority is
    /// outside `1..=16`.
    fn attach(&mut self, pipe: P) -> Result<PipeId, Error>;

    /// Unregister a pipe, returning its handle
    fn detach(&mut self, id: PipeId) -> Option<P>;

    /// The pipe has inbound messages
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPipe`] if the pipe is not attached.
    fn mark_readable(&mut self, id: PipeId) -> Result<(), Error>;

    /// The pipe can accept an outbound message
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPipe`] if the pipe is not attached.
    fn mark_writable(&mut self, id: PipeId) -> Result<(), Error>;

    /// Current readiness
    fn events(&self) -> Events;

    /// Route an outbound message
    ///
    /// # Errors
    ///
    /// Rejected messages are handed back inside the [`SendError`].
    fn send(&mut self, msg: Message) -> Result<(), SendError>;

    /// Take the next inbound message; `None` means nothing is ready
    fn recv(&mut self) -> Option<Message>;

    /// Apply a socket option
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptionAlreadySet`] for a second local name.
    fn set_option(&mut self, option: SocketOption) -> Result<(), Error>;
}
