//! Per-pipe routing records and the arena that owns them.
//!
//! The table is the single owner of every [`PipeRecord`] for as long as its
//! pipe is attached. The fair queue and the distributor never hold records
//! themselves; each keeps its own membership marker on the record and
//! refers to it by [`PipeId`].
//!
//! Slots are reused after detachment, but every reuse bumps the slot
//! generation so outdated handles and tokens are rejected rather than
//! silently aliasing the new occupant.

use crate::distributor::RegistrationStage;
use crate::error::IdentityError;
use crate::identity::{PipeId, PipeToken};

/// Fair queue membership of a pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InputMembership {
    pub(crate) priority: u8,
    pub(crate) readable: bool,
}

/// Distributor membership of a pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OutputMembership {
    pub(crate) stage: RegistrationStage,
    /// Position in the distributor's output set while linked
    pub(crate) slot: Option<usize>,
}

/// Routing state kept for one attached pipe
#[derive(Debug)]
pub struct PipeRecord<P> {
    pipe: P,
    pub(crate) input: InputMembership,
    pub(crate) output: OutputMembership,
}

impl<P> PipeRecord<P> {
    fn new(pipe: P, priority: u8) -> Self {
        Self {
            pipe,
            input: InputMembership {
                priority,
                readable: false,
            },
            output: OutputMembership {
                stage: RegistrationStage::Pending,
                slot: None,
            },
        }
    }

    /// The pipe handle
    pub fn pipe(&self) -> &P {
        &self.pipe
    }

    /// Mutable pipe handle
    pub fn pipe_mut(&mut self) -> &mut P {
        &mut self.pipe
    }

    /// Release the record, returning the pipe handle
    pub fn into_pipe(self) -> P {
        self.pipe
    }

    /// Receive priority the pipe was registered with
    pub fn priority(&self) -> u8 {
        self.input.priority
    }

    /// Whether the pipe is in the fair queue's readable set
    pub fn is_readable(&self) -> bool {
        self.input.readable
    }

    /// Registration stage with the distributor
    pub fn stage(&self) -> RegistrationStage {
        self.output.stage
    }

    /// Whether the pipe is linked into the distributor's output set
    pub fn is_linked(&self) -> bool {
        self.output.slot.is_some()
    }
}

#[derive(Debug)]
enum Slot<P> {
    Occupied {
        generation: u32,
        record: PipeRecord<P>,
    },
    Vacant {
        generation: u32,
    },
}

/// Generation-checked arena of pipe records
#[derive(Debug)]
pub struct PipeTable<P> {
    slots: Vec<Slot<P>>,
    free: Vec<u32>,
    len: usize,
}

impl<P> PipeTable<P> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Store a new record and return its handle
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` slots would be needed.
    pub fn insert(&mut self, pipe: P, priority: u8) -> PipeId {
        let record = PipeRecord::new(pipe, priority);
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            let generation = match slot {
                Slot::Vacant { generation } => *generation,
                Slot::Occupied { .. } => unreachable!("free list points at an occupied slot"),
            };
            *slot = Slot::Occupied { generation, record };
            return PipeId::new(index, generation);
        }

        let index = u32::try_from(self.slots.len()).expect("pipe table index overflow");
        self.slots.push(Slot::Occupied {
            generation: 1,
            record,
        });
        PipeId::new(index, 1)
    }

    /// Remove a record, invalidating its handle
    pub fn remove(&mut self, id: PipeId) -> Option<PipeRecord<P>> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == id.generation() => {}
            _ => return None,
        }

        // Generation 0 is never issued, so wrap straight to 1.
        let next = id.generation().checked_add(1).unwrap_or(1);
        let Slot::Occupied { record, .. } =
            std::mem::replace(slot, Slot::Vacant { generation: next })
        else {
            unreachable!("slot checked occupied above");
        };

        self.free.push(id.index());
        self.len -= 1;
        Some(record)
    }

    /// Look up a record
    pub fn get(&self, id: PipeId) -> Option<&PipeRecord<P>> {
        match self.slots.get(id.index() as usize)? {
            Slot::Occupied { generation, record } if *generation == id.generation() => {
                Some(record)
            }
            _ => None,
        }
    }

    /// Look up a record mutably
    pub fn get_mut(&mut self, id: PipeId) -> Option<&mut PipeRecord<P>> {
        match self.slots.get_mut(id.index() as usize)? {
            Slot::Occupied { generation, record } if *generation == id.generation() => {
                Some(record)
            }
            _ => None,
        }
    }

    /// Check whether a handle refers to an attached pipe
    pub fn contains(&self, id: PipeId) -> bool {
        self.get(id).is_some()
    }

    /// Resolve a routing-header token to an attached pipe
    ///
    /// # Errors
    ///
    /// - [`IdentityError::Unknown`] if the token names a slot this table
    ///   never issued
    /// - [`IdentityError::Stale`] if the pipe it named has been detached
    pub fn resolve(&self, token: PipeToken) -> Result<PipeId, IdentityError> {
        let id = token.pipe_id();
        if id.generation() == 0 {
            return Err(IdentityError::Unknown(id));
        }
        match self.slots.get(id.index() as usize) {
            None => Err(IdentityError::Unknown(id)),
            Some(Slot::Occupied { generation, .. }) if *generation == id.generation() => Ok(id),
            Some(_) => Err(IdentityError::Stale(id)),
        }
    }

    /// Number of attached pipes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check whether no pipe is attached
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over attached pipes
    pub fn iter(&self) -> impl Iterator<Item = (PipeId, &PipeRecord<P>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { generation, record } => {
                    Some((PipeId::new(index as u32, *generation), record))
                }
                Slot::Vacant { .. } => None,
            })
    }

    /// Handles of all attached pipes
    pub fn ids(&self) -> Vec<PipeId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Number of records linked into the distributor's output set
    pub fn linked_count(&self) -> usize {
        self.iter().filter(|(_, record)| record.is_linked()).count()
    }
}

impl<P> Default for PipeTable<P> {
    fn default() -> Self {
        Self::new()
    }
}
