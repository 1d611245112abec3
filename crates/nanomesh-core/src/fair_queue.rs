//! Priority fair queueing of inbound messages.
//!
//! Readable pipes are kept in one ring per receive priority. Receiving
//! always serves the highest priority ring that has a readable pipe
//! (priority 1 before 16) and rotates through that ring one message at a
//! time. A pipe leaves its ring when its receive reports
//! [`PipeStatus::Release`](crate::pipe::PipeStatus::Release) and rejoins when the framework marks it
//! readable again.

use crate::error::Error;
use crate::identity::PipeId;
use crate::message::Message;
use crate::pipe::Pipe;
use crate::table::PipeTable;
use crate::{MAX_PRIORITY, MIN_PRIORITY};

const LEVELS: usize = MAX_PRIORITY as usize;

/// Readable pipes of one priority
#[derive(Debug, Default)]
struct Ring {
    pipes: Vec<PipeId>,
    cursor: usize,
}

impl Ring {
    fn current(&self) -> Option<PipeId> {
        self.pipes.get(self.cursor).copied()
    }

    fn push(&mut self, id: PipeId) {
        self.pipes.push(id);
    }

    fn remove(&mut self, id: PipeId) -> bool {
        let Some(pos) = self.pipes.iter().position(|&p| p == id) else {
            return false;
        };
        self.pipes.remove(pos);
        if pos < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.pipes.len() {
            self.cursor = 0;
        }
        true
    }

    fn rotate(&mut self) {
        if !self.pipes.is_empty() {
            self.cursor = (self.cursor + 1) % self.pipes.len();
        }
    }
}

/// Inbound scheduler over the pipes of one socket
#[derive(Debug, Default)]
pub struct FairQueue {
    rings: [Ring; LEVELS],
}

impl FairQueue {
    /// Create an empty fair queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a receive priority
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPriority`] outside `1..=16`.
    pub fn check_priority(priority: u8) -> Result<u8, Error> {
        if (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            Ok(priority)
        } else {
            Err(Error::InvalidPriority(priority))
        }
    }

    /// Register a freshly attached pipe
    ///
    /// The pipe starts out unreadable; its priority is taken from the
    /// record.
    pub fn register<P>(&mut self, table: &mut PipeTable<P>, id: PipeId) {
        if let Some(record) = table.get_mut(id) {
            record.input.readable = false;
            tracing::trace!(
                "Fair queue: registered {} at priority {}",
                id,
                record.input.priority
            );
        }
    }

    /// Drop a pipe from the readable set ahead of detachment
    pub fn unregister<P>(&mut self, table: &mut PipeTable<P>, id: PipeId) {
        let Some(record) = table.get_mut(id) else {
            return;
        };
        if record.input.readable {
            record.input.readable = false;
            self.ring_mut(record.input.priority).remove(id);
        }
        tracing::trace!("Fair queue: unregistered {}", id);
    }

    /// Add a pipe to the readable set
    ///
    /// Marking a pipe that is already readable is a no-op.
    pub fn mark_readable<P>(&mut self, table: &mut PipeTable<P>, id: PipeId) {
        let Some(record) = table.get_mut(id) else {
            return;
        };
        if !record.input.readable {
            record.input.readable = true;
            self.ring_mut(record.input.priority).push(id);
        }
    }

    /// Check whether any pipe is readable
    pub fn can_recv(&self) -> bool {
        self.rings.iter().any(|ring| !ring.pipes.is_empty())
    }

    /// Number of readable pipes
    pub fn readable_count(&self) -> usize {
        self.rings.iter().map(|ring| ring.pipes.len()).sum()
    }

    /// Receive the next message in priority fair order
    ///
    /// Returns `None` when no readable pipe has a message.
    pub fn recv<P: Pipe>(&mut self, table: &mut PipeTable<P>) -> Option<(PipeId, Message)> {
        loop {
            let (level, id) = self.current()?;

            let Some(record) = table.get_mut(id) else {
                // Detached without unregistering; forget it.
                tracing::warn!("Fair queue: dropping detached {}", id);
                self.rings[level].remove(id);
                continue;
            };

            match record.pipe_mut().recv() {
                Some((msg, status)) => {
                    if status.is_release() {
                        record.input.readable = false;
                        self.rings[level].remove(id);
                    } else {
                        self.rings[level].rotate();
                    }
                    return Some((id, msg));
                }
                None => {
                    record.input.readable = false;
                    self.rings[level].remove(id);
                }
            }
        }
    }

    fn current(&self) -> Option<(usize, PipeId)> {
        self.rings
            .iter()
            .enumerate()
            .find_map(|(level, ring)| ring.current().map(|id| (level, id)))
    }

    fn ring_mut(&mut self, priority: u8) -> &mut Ring {
        let level = usize::from(priority.clamp(MIN_PRIORITY, MAX_PRIORITY) - 1);
        &mut self.rings[level]
    }
}
