//! # nanomesh Core
//!
//! Brokerless N:M routing socket for the nanomesh messaging library.
//!
//! This crate provides:
//! - Pipe identity tokens backed by a generation-checked arena
//! - Priority fair queueing of inbound messages
//! - Named multicast distribution with an in-band peer self-announcement
//! - Raw (`RawRouter`) and cooked (`Router`) routing sockets
//! - An in-memory pipe and mesh driver for tests and simulations
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Router (cooked)                            │
//! │   (no routing headers in or out, name-based reachability)       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                      RawRouter                                  │
//! │   (routing header framing, pipe lifecycle, announce intercept)  │
//! ├──────────────────────────────┬──────────────────────────────────┤
//! │  FairQueue (inbound)         │  Distributor (outbound)          │
//! ├──────────────────────────────┴──────────────────────────────────┤
//! │                      PipeTable                                  │
//! │   (per-pipe routing records, identity tokens)                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pipes themselves belong to the transport framework; the sockets only
//! hold handles implementing [`Pipe`] and react to lifecycle events.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cooked;
pub mod distributor;
pub mod error;
pub mod fair_queue;
pub mod identity;
pub mod memory;
pub mod message;
pub mod name;
pub mod options;
pub mod pipe;
pub mod router;
pub mod socket;
pub mod table;

pub use cooked::Router;
pub use distributor::{Distributor, DistributorStats, Inbound, RegistrationStage};
pub use error::{Error, IdentityError, SendError, StageError};
pub use fair_queue::FairQueue;
pub use identity::{PipeId, PipeToken};
pub use memory::{MemoryPipe, Mesh, NodeId};
pub use message::Message;
pub use name::PeerName;
pub use options::{ExclusionPolicy, RouterConfig, SocketOption};
pub use pipe::{Pipe, PipeStatus};
pub use router::RawRouter;
pub use socket::{Domain, Events, Protocol, Socket};
pub use table::PipeTable;

/// Width of an identity token and of a routing header, in bytes
pub const TOKEN_SIZE: usize = 8;

/// Width of a registered peer name, in bytes
pub const NAME_SIZE: usize = 4;

/// Size of the self-announcement body (name plus a zero terminator)
pub const ANNOUNCE_SIZE: usize = NAME_SIZE + 1;

/// Numerically smallest receive priority (served first)
pub const MIN_PRIORITY: u8 = 1;

/// Numerically largest receive priority (served last)
pub const MAX_PRIORITY: u8 = 16;

/// Receive priority used when a pipe does not state one
pub const DEFAULT_PRIORITY: u8 = 8;
