//! The pipe contract consumed from the transport framework.

use crate::DEFAULT_PRIORITY;
use crate::message::Message;

/// Outcome of a single pipe operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeStatus {
    /// The pipe can take (or yield) another message right away
    Continue,
    /// The pipe is spent until the framework signals it again
    ///
    /// After a send this means "wait for the next write-ready event";
    /// after a receive it means "wait for the next read-ready event". A
    /// pipe that disconnected reports `Release` on every operation.
    Release,
}

impl PipeStatus {
    /// Check whether the pipe was released
    #[must_use]
    pub fn is_release(self) -> bool {
        self == Self::Release
    }

    /// Status for a receive that left `remaining` messages queued
    #[must_use]
    pub fn after_recv(remaining: usize) -> Self {
        if remaining == 0 {
            Self::Release
        } else {
            Self::Continue
        }
    }
}

/// Handle to a full-duplex, transport-owned channel to one peer
///
/// Sockets call these methods only from within their own operations, which
/// the framework already serializes, so implementations need no locking of
/// their own.
pub trait Pipe {
    /// Hand a message to the transport
    fn send(&mut self, msg: Message) -> PipeStatus;

    /// Take the next inbound message, if one is queued
    ///
    /// `None` means the pipe had nothing to read despite being marked
    /// readable; the fair queue treats it like a release.
    fn recv(&mut self) -> Option<(Message, PipeStatus)>;

    /// Receive priority, 1 (highest) to 16 (lowest)
    fn recv_priority(&self) -> u8 {
        DEFAULT_PRIORITY
    }
}

impl<P: Pipe + ?Sized> Pipe for Box<P> {
    fn send(&mut self, msg: Message) -> PipeStatus {
        (**self).send(msg)
    }

    fn recv(&mut self) -> Option<(Message, PipeStatus)> {
        (**self).recv()
    }

    fn recv_priority(&self) -> u8 {
        (**self).recv_priority()
    }
}
