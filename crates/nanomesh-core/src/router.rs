//! Raw routing socket.
//!
//! The raw socket exposes routing headers to its user. Every received
//! message carries the [`PipeToken`] of the pipe it arrived on as an
//! 8-byte header; an outbound message may carry such a token to name the
//! pipe it should not be sent back to. This is the layer devices use to
//! forward traffic between sockets unchanged.

use bytes::Bytes;

use crate::distributor::{Distributor, DistributorStats, Inbound, RegistrationStage};
use crate::error::{Error, SendError};
use crate::fair_queue::FairQueue;
use crate::identity::{PipeId, PipeToken};
use crate::message::Message;
use crate::options::{ExclusionPolicy, RouterConfig, SocketOption};
use crate::pipe::Pipe;
use crate::socket::{Domain, Events, Protocol, Socket};
use crate::table::{PipeRecord, PipeTable};
use crate::{TOKEN_SIZE, name::PeerName};

/// Raw routing socket over pipes of type `P`
#[derive(Debug)]
pub struct RawRouter<P> {
    table: PipeTable<P>,
    fair_queue: FairQueue,
    distributor: Distributor,
    /// Inbound messages dropped for carrying a header already
    dropped_inbound: u64,
}

impl<P: Pipe> RawRouter<P> {
    /// Create a router with no local name
    pub fn new() -> Self {
        Self {
            table: PipeTable::new(),
            fair_queue: FairQueue::new(),
            distributor: Distributor::new(),
            dropped_inbound: 0,
        }
    }

    /// Create a router and apply a configuration
    ///
    /// # Errors
    ///
    /// Propagates errors from applying the configured options.
    pub fn with_config(config: &RouterConfig) -> Result<Self, Error> {
        let mut router = Self::new();
        for option in config.options() {
            router.set_option(option)?;
        }
        Ok(router)
    }

    /// Name announced to peers
    pub fn local_name(&self) -> PeerName {
        self.distributor.local_name()
    }

    /// Exclusion policy in force
    pub fn exclusion(&self) -> ExclusionPolicy {
        self.distributor.exclusion()
    }

    /// Number of pipes in the distributor's output set
    pub fn output_len(&self) -> usize {
        self.distributor.len()
    }

    /// Number of attached pipes
    pub fn pipe_count(&self) -> usize {
        self.table.len()
    }

    /// Routing record of an attached pipe
    pub fn record(&self, id: PipeId) -> Option<&PipeRecord<P>> {
        self.table.get(id)
    }

    /// Registration stage of an attached pipe
    pub fn stage(&self, id: PipeId) -> Option<RegistrationStage> {
        self.table.get(id).map(PipeRecord::stage)
    }

    /// The pipe table
    pub fn table(&self) -> &PipeTable<P> {
        &self.table
    }

    /// Distributor counters
    pub fn stats(&self) -> DistributorStats {
        self.distributor.stats()
    }

    /// Inbound messages dropped because they already carried a header
    pub fn dropped_inbound(&self) -> u64 {
        self.dropped_inbound
    }

    /// Resolve a routing header token to the pipe it names
    ///
    /// # Errors
    ///
    /// Returns [`Error::Identity`] for tokens of the wrong size or that name
    /// no attached pipe.
    pub fn resolve(&self, header: &[u8]) -> Result<PipeId, Error> {
        let token = PipeToken::from_slice(header)?;
        Ok(self.table.resolve(token)?)
    }

    /// Validate the routing header and strip it
    fn exclusion_target(&self, msg: &mut Message) -> Result<Option<PipeId>, Error> {
        let header = msg.header();
        match header.len() {
            0 => Ok(None),
            TOKEN_SIZE => {
                let token = PipeToken::from_slice(header)?;
                let target = match self.table.resolve(token) {
                    Ok(id) => Some(id),
                    Err(err) => {
                        tracing::trace!("Router: exclude token {} not applied: {}", token, err);
                        None
                    }
                };
                msg.take_header();
                Ok(target)
            }
            len => Err(Error::MalformedHeader(len)),
        }
    }
}

impl<P: Pipe> Default for RawRouter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Pipe> Socket<P> for RawRouter<P> {
    fn protocol(&self) -> Protocol {
        Protocol::ROUTER
    }

    fn domain(&self) -> Domain {
        Domain::Raw
    }

    fn attach(&mut self, pipe: P) -> Result<PipeId, Error> {
        let priority = FairQueue::check_priority(pipe.recv_priority())?;
        let id = self.table.insert(pipe, priority);
        self.fair_queue.register(&mut self.table, id);
        tracing::debug!("Router: attached {} (priority {})", id, priority);
        Ok(id)
    }

    fn detach(&mut self, id: PipeId) -> Option<P> {
        self.fair_queue.unregister(&mut self.table, id);
        self.distributor.remove(&mut self.table, id);
        let record = self.table.remove(id)?;
        tracing::debug!("Router: detached {} ({:?})", id, record.stage());
        Some(record.into_pipe())
    }

    fn mark_readable(&mut self, id: PipeId) -> Result<(), Error> {
        if !self.table.contains(id) {
            tracing::warn!("Router: read-ready for unknown {}", id);
            return Err(Error::UnknownPipe(id));
        }
        self.fair_queue.mark_readable(&mut self.table, id);
        Ok(())
    }

    fn mark_writable(&mut self, id: PipeId) -> Result<(), Error> {
        self.distributor
            .on_writable(&mut self.table, id)
            .inspect_err(|_| tracing::warn!("Router: write-ready for unknown {}", id))
    }

    fn events(&self) -> Events {
        Events {
            readable: self.fair_queue.can_recv(),
            writable: true,
        }
    }

    fn send(&mut self, mut msg: Message) -> Result<(), SendError> {
        let exclude = match self.exclusion_target(&mut msg) {
            Ok(exclude) => exclude,
            Err(err) => {
                tracing::debug!("Router: rejected send: {}", err);
                return Err(SendError::new(err, msg));
            }
        };
        self.distributor.send(&mut self.table, msg, exclude);
        Ok(())
    }

    fn recv(&mut self) -> Option<Message> {
        loop {
            let (id, msg) = self.fair_queue.recv(&mut self.table)?;

            let mut msg = match self.distributor.intercept(&mut self.table, id, msg) {
                Inbound::Named(_) => continue,
                Inbound::Deliver(msg) => msg,
            };

            if msg.has_header() {
                self.dropped_inbound += 1;
                tracing::debug!(
                    "Router: dropping inbound message from {} with {}-byte header",
                    id,
                    msg.header().len()
                );
                continue;
            }

            msg.set_header(Bytes::copy_from_slice(id.to_token().as_bytes()));
            return Some(msg);
        }
    }

    fn set_option(&mut self, option: SocketOption) -> Result<(), Error> {
        match option {
            SocketOption::LocalName(name) => self.distributor.set_local_name(name),
            SocketOption::Exclusion(policy) => {
                self.distributor.set_exclusion(policy);
                Ok(())
            }
        }
    }
}
