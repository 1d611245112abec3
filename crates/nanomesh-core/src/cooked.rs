//! Cooked routing socket.
//!
//! Applications address peers purely by the name their message body starts
//! with and never see routing headers.

use crate::distributor::{DistributorStats, RegistrationStage};
use crate::error::{Error, SendError};
use crate::identity::PipeId;
use crate::message::Message;
use crate::name::PeerName;
use crate::options::{RouterConfig, SocketOption};
use crate::pipe::Pipe;
use crate::router::RawRouter;
use crate::socket::{Domain, Events, Protocol, Socket};
use crate::TOKEN_SIZE;

/// Application-facing routing socket
#[derive(Debug)]
pub struct Router<P> {
    raw: RawRouter<P>,
}

impl<P: Pipe> Router<P> {
    /// Create a router with no local name
    pub fn new() -> Self {
        Self {
            raw: RawRouter::new(),
        }
    }

    /// Create a router and apply a configuration
    ///
    /// # Errors
    ///
    /// Propagates errors from applying the configured options.
    pub fn with_config(config: &RouterConfig) -> Result<Self, Error> {
        Ok(Self {
            raw: RawRouter::with_config(config)?,
        })
    }

    /// Name announced to peers
    pub fn local_name(&self) -> PeerName {
        self.raw.local_name()
    }

    /// Number of pipes in the distributor's output set
    pub fn output_len(&self) -> usize {
        self.raw.output_len()
    }

    /// Registration stage of an attached pipe
    pub fn stage(&self, id: PipeId) -> Option<RegistrationStage> {
        self.raw.stage(id)
    }

    /// Distributor counters
    pub fn stats(&self) -> DistributorStats {
        self.raw.stats()
    }

    /// The underlying raw socket
    pub fn as_raw(&self) -> &RawRouter<P> {
        &self.raw
    }
}

impl<P: Pipe> Default for Router<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Pipe> Socket<P> for Router<P> {
    fn protocol(&self) -> Protocol {
        self.raw.protocol()
    }

    fn domain(&self) -> Domain {
        Domain::Cooked
    }

    fn attach(&mut self, pipe: P) -> Result<PipeId, Error> {
        self.raw.attach(pipe)
    }

    fn detach(&mut self, id: PipeId) -> Option<P> {
        self.raw.detach(id)
    }

    fn mark_readable(&mut self, id: PipeId) -> Result<(), Error> {
        self.raw.mark_readable(id)
    }

    fn mark_writable(&mut self, id: PipeId) -> Result<(), Error> {
        self.raw.mark_writable(id)
    }

    fn events(&self) -> Events {
        self.raw.events()
    }

    fn send(&mut self, msg: Message) -> Result<(), SendError> {
        if msg.has_header() {
            return Err(SendError::new(Error::HeaderNotPermitted, msg));
        }
        self.raw.send(msg)
    }

    fn recv(&mut self) -> Option<Message> {
        let mut msg = self.raw.recv()?;
        assert_eq!(
            msg.header().len(),
            TOKEN_SIZE,
            "raw router delivered a message without a pipe token"
        );
        msg.take_header();
        Some(msg)
    }

    fn set_option(&mut self, option: SocketOption) -> Result<(), Error> {
        self.raw.set_option(option)
    }
}
