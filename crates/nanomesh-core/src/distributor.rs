//! Named multicast distribution of outbound messages.
//!
//! The distributor decides which attached pipes receive an outbound
//! message. Pipes become deliverable through a two-step registration driven
//! purely by write-ready events:
//!
//! ```text
//!   attach          1st write-ready          2nd write-ready
//!  ───────▶ Pending ───────────────▶ AnnounceSent ───────────────▶ Eligible(None)
//!                   sends own name                  linked into
//!                   to the peer                     output set
//!
//!  Eligible(None) ── 1st inbound message from peer ──▶ Eligible(Some(name))
//!                    (consumed as the peer's name)
//! ```
//!
//! Outbound messages go to every linked pipe whose registered name equals
//! the first [`NAME_SIZE`](crate::NAME_SIZE) bytes of the message body.
//! A pipe that reports [`PipeStatus::Release`](crate::pipe::PipeStatus)
//! while being sent to is unlinked on the spot and relinked by its next
//! write-ready event; its name is kept.

use bytes::Bytes;

use crate::error::{Error, StageError};
use crate::identity::PipeId;
use crate::message::Message;
use crate::name::PeerName;
use crate::options::ExclusionPolicy;
use crate::pipe::Pipe;
use crate::table::{PipeRecord, PipeTable};

/// Registration stage of a pipe with the distributor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStage {
    /// Attached, no write opportunity yet
    Pending,
    /// First write opportunity spent on the self-announcement
    AnnounceSent,
    /// Deliverable; carries the peer's name once it has been received
    Eligible(Option<PeerName>),
}

impl RegistrationStage {
    /// Check if a stage transition is valid
    #[must_use]
    pub fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::AnnounceSent)
                | (Self::AnnounceSent, Self::Eligible(None))
                | (Self::Eligible(None), Self::Eligible(Some(_)))
        )
    }

    /// Registered peer name, if any
    #[must_use]
    pub fn name(self) -> Option<PeerName> {
        match self {
            Self::Eligible(name) => name,
            _ => None,
        }
    }

    /// Whether the pipe has completed the announcement step
    #[must_use]
    pub fn is_eligible(self) -> bool {
        matches!(self, Self::Eligible(_))
    }
}

/// Result of passing an inbound message through the naming handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Ordinary traffic for the application
    Deliver(Message),
    /// The message was the peer's self-announcement and has been consumed
    Named(PeerName),
}

/// Distributor counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributorStats {
    /// Self-announcements sent
    pub announcements_sent: u64,
    /// Peer names registered from inbound announcements
    pub names_registered: u64,
    /// Per-pipe copies handed to pipes
    pub delivered: u64,
    /// Outbound messages that matched no linked pipe
    pub unroutable: u64,
    /// Pipes unlinked because a send released them
    pub released: u64,
}

/// Registry of outbound-eligible pipes
#[derive(Debug, Default)]
pub struct Distributor {
    /// Output set; each member's record holds its index here
    linked: Vec<PipeId>,
    local_name: Option<PeerName>,
    exclusion: ExclusionPolicy,
    stats: DistributorStats,
}

impl Distributor {
    /// Create an empty distributor
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name announced to every new peer
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptionAlreadySet`] if a name was already set.
    pub fn set_local_name(&mut self, name: PeerName) -> Result<(), Error> {
        if self.local_name.is_some() {
            return Err(Error::OptionAlreadySet("local_name"));
        }
        tracing::debug!("Distributor: local name set to {}", name);
        self.local_name = Some(name);
        Ok(())
    }

    /// Name announced to peers ([`PeerName::UNSET`] until set)
    pub fn local_name(&self) -> PeerName {
        self.local_name.unwrap_or(PeerName::UNSET)
    }

    /// Choose whether the exclude token of an outbound message is honoured
    pub fn set_exclusion(&mut self, policy: ExclusionPolicy) {
        self.exclusion = policy;
    }

    /// Exclusion policy in force
    pub fn exclusion(&self) -> ExclusionPolicy {
        self.exclusion
    }

    /// Number of pipes in the output set
    pub fn len(&self) -> usize {
        self.linked.len()
    }

    /// Check whether the output set is empty
    pub fn is_empty(&self) -> bool {
        self.linked.is_empty()
    }

    /// Pipes in the output set
    ///
    /// Unlinking moves the last member into the freed position, so the order
    /// is only stable while nothing leaves the set.
    pub fn linked(&self) -> &[PipeId] {
        &self.linked
    }

    /// Distributor counters
    pub fn stats(&self) -> DistributorStats {
        self.stats
    }

    /// Handle a write-ready event for a pipe
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPipe`] if the pipe is not attached.
    pub fn on_writable<P: Pipe>(
        &mut self,
        table: &mut PipeTable<P>,
        id: PipeId,
    ) -> Result<(), Error> {
        let record = table.get_mut(id).ok_or(Error::UnknownPipe(id))?;

        match record.output.stage {
            RegistrationStage::Pending => {
                let body = Bytes::copy_from_slice(&self.local_name().announcement());
                let status = record.pipe_mut().send(Message::new(body));
                advance(record, id, RegistrationStage::AnnounceSent);
                self.stats.announcements_sent += 1;
                tracing::debug!(
                    "Distributor: announced {} on {} ({:?})",
                    self.local_name(),
                    id,
                    status
                );
            }
            RegistrationStage::AnnounceSent => {
                advance(record, id, RegistrationStage::Eligible(None));
                self.link(record, id);
            }
            RegistrationStage::Eligible(_) if record.is_linked() => {
                tracing::trace!("Distributor: {} already linked", id);
            }
            RegistrationStage::Eligible(_) => self.link(record, id),
        }

        Ok(())
    }

    /// Run an inbound message through the naming handshake
    ///
    /// Only linked pipes take part: the first message from a linked pipe
    /// without a name is consumed as its name. Messages from unlinked pipes,
    /// including peers whose announcement arrives before this side's second
    /// write-ready event, pass through unchanged.
    pub fn intercept<P>(&mut self, table: &mut PipeTable<P>, id: PipeId, msg: Message) -> Inbound {
        let Some(record) = table.get_mut(id) else {
            return Inbound::Deliver(msg);
        };
        if !record.is_linked() {
            return Inbound::Deliver(msg);
        }
        match record.output.stage {
            RegistrationStage::Eligible(None) => {
                let name = PeerName::from_prefix(msg.body());
                advance(record, id, RegistrationStage::Eligible(Some(name)));
                self.stats.names_registered += 1;
                tracing::debug!("Distributor: {} registered as {}", id, name);
                Inbound::Named(name)
            }
            _ => Inbound::Deliver(msg),
        }
    }

    /// Forward a message to every linked pipe registered under the name its
    /// body starts with
    ///
    /// `exclude` names the pipe to skip; it is only applied under
    /// [`ExclusionPolicy::SkipExcluded`]. Returns the number of copies
    /// handed to pipes. A message nobody matches is dropped.
    pub fn send<P: Pipe>(
        &mut self,
        table: &mut PipeTable<P>,
        msg: Message,
        exclude: Option<PipeId>,
    ) -> usize {
        if self.linked.is_empty() {
            self.stats.unroutable += 1;
            tracing::trace!("Distributor: no linked pipes, dropping message");
            return 0;
        }

        let target = PeerName::from_prefix(msg.body());
        let skip = match self.exclusion {
            ExclusionPolicy::Ignore => None,
            ExclusionPolicy::SkipExcluded => exclude,
        };

        let mut delivered = 0;
        let mut i = 0;
        while i < self.linked.len() {
            let id = self.linked[i];
            let Some(record) = table.get_mut(id) else {
                tracing::warn!("Distributor: unlinking detached {}", id);
                self.unlink_at(table, i);
                continue;
            };
            if record.output.stage.name() != Some(target) || skip == Some(id) {
                i += 1;
                continue;
            }

            delivered += 1;
            if record.pipe_mut().send(msg.clone()).is_release() {
                record.output.slot = None;
                self.stats.released += 1;
                tracing::trace!("Distributor: {} released during send", id);
                // The swapped-in member comes from the unvisited tail.
                self.unlink_at(table, i);
            } else {
                i += 1;
            }
        }

        self.stats.delivered += delivered as u64;
        if delivered == 0 {
            self.stats.unroutable += 1;
            tracing::trace!("Distributor: no pipe named {}, dropping message", target);
        }
        delivered
    }

    /// Take a pipe out of the output set ahead of detachment
    ///
    /// Safe for pipes that were never linked.
    pub fn remove<P>(&mut self, table: &mut PipeTable<P>, id: PipeId) {
        let Some(record) = table.get_mut(id) else {
            return;
        };
        if let Some(slot) = record.output.slot.take() {
            self.unlink_at(table, slot);
            tracing::debug!("Distributor: unlinked {}", id);
        }
    }

    fn link<P>(&mut self, record: &mut PipeRecord<P>, id: PipeId) {
        record.output.slot = Some(self.linked.len());
        self.linked.push(id);
        tracing::debug!(
            "Distributor: linked {} ({} in output set)",
            id,
            self.linked.len()
        );
    }

    /// Drop the output set entry at `slot`, filling the gap with the last one
    fn unlink_at<P>(&mut self, table: &mut PipeTable<P>, slot: usize) {
        self.linked.swap_remove(slot);
        if let Some(&moved) = self.linked.get(slot) {
            if let Some(record) = table.get_mut(moved) {
                record.output.slot = Some(slot);
            }
        }
    }
}

/// Apply a validated stage transition
fn advance<P>(record: &mut PipeRecord<P>, id: PipeId, to: RegistrationStage) {
    let from = record.output.stage;
    if from.can_transition(to) {
        record.output.stage = to;
        tracing::trace!("Distributor: {} stage {:?} -> {:?}", id, from, to);
    } else {
        let err = StageError::InvalidTransition { from, to };
        tracing::warn!("Distributor: {} {}", id, err);
    }
}
