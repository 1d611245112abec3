//! In-memory pipes and a deterministic driver for meshes of sockets.
//!
//! [`MemoryPipe`] behaves like a stream transport: each send puts one
//! message on the wire and releases the pipe until the wire has been
//! flushed, at which point the sender is signalled write-ready again and
//! the receiver read-ready. [`Mesh`] owns a set of sockets, wires them
//! together and delivers those signals in a fixed order:
//!
//! ```text
//!   pump():  1. flush every wire          (in flight -> peer inbox)
//!            2. deliver write-ready       (socket.mark_writable)
//!            3. deliver read-ready        (socket.mark_readable)
//! ```
//!
//! Write-ready before read-ready means a freshly linked pipe is already in
//! the output set when its peer's announcement is received, so the naming
//! handshake completes on a quiet mesh. Because every send releases the
//! pipe, at most one message per pipe fits between two pumps; later ones
//! are dropped as unroutable.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::DEFAULT_PRIORITY;
use crate::error::Error;
use crate::identity::PipeId;
use crate::message::Message;
use crate::pipe::{Pipe, PipeStatus};
use crate::socket::Socket;

/// Upper bound on pump rounds in [`Mesh::settle`]
pub const SETTLE_ROUNDS: usize = 64;

/// One direction of a connection
#[derive(Debug)]
struct Wire {
    in_flight: VecDeque<Message>,
    arrived: VecDeque<Message>,
    write_ready: bool,
    read_ready: bool,
    closed: bool,
}

impl Wire {
    fn new() -> Self {
        Self {
            in_flight: VecDeque::new(),
            arrived: VecDeque::new(),
            // A new connection is writable straight away.
            write_ready: true,
            read_ready: false,
            closed: false,
        }
    }
}

/// One end of an in-memory connection
///
/// Clones share the same wires, so the transport side can keep a handle
/// while the socket owns another.
#[derive(Debug, Clone)]
pub struct MemoryPipe {
    tx: Rc<RefCell<Wire>>,
    rx: Rc<RefCell<Wire>>,
    priority: u8,
}

impl MemoryPipe {
    /// Create both ends of a connection
    pub fn pair() -> (Self, Self) {
        let forward = Rc::new(RefCell::new(Wire::new()));
        let backward = Rc::new(RefCell::new(Wire::new()));
        let a = Self {
            tx: Rc::clone(&forward),
            rx: Rc::clone(&backward),
            priority: DEFAULT_PRIORITY,
        };
        let b = Self {
            tx: backward,
            rx: forward,
            priority: DEFAULT_PRIORITY,
        };
        (a, b)
    }

    /// Set the receive priority this end reports
    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Deliver everything this end has sent to the peer's inbox
    ///
    /// Returns the number of messages moved. Moving any message re-arms
    /// this end's write-ready signal and the peer's read-ready signal.
    pub fn flush(&self) -> usize {
        let mut wire = self.tx.borrow_mut();
        let moved = wire.in_flight.len();
        if moved > 0 {
            let Wire {
                in_flight, arrived, ..
            } = &mut *wire;
            arrived.extend(in_flight.drain(..));
            wire.write_ready = true;
            wire.read_ready = true;
        }
        moved
    }

    /// Take this end's pending write-ready signal
    pub fn poll_writable(&self) -> bool {
        let mut wire = self.tx.borrow_mut();
        !wire.closed && std::mem::take(&mut wire.write_ready)
    }

    /// Take this end's pending read-ready signal
    pub fn poll_readable(&self) -> bool {
        std::mem::take(&mut self.rx.borrow_mut().read_ready)
    }

    /// Tear the connection down in both directions
    pub fn close(&self) {
        for wire in [&self.tx, &self.rx] {
            let mut wire = wire.borrow_mut();
            wire.closed = true;
            wire.in_flight.clear();
            wire.write_ready = false;
        }
    }

    /// Check whether the connection was closed
    pub fn is_closed(&self) -> bool {
        self.tx.borrow().closed
    }

    /// Messages sent by this end and not yet flushed
    pub fn in_flight(&self) -> usize {
        self.tx.borrow().in_flight.len()
    }

    /// Messages waiting to be received by this end
    pub fn queued(&self) -> usize {
        self.rx.borrow().arrived.len()
    }
}

impl Pipe for MemoryPipe {
    fn send(&mut self, msg: Message) -> PipeStatus {
        let mut wire = self.tx.borrow_mut();
        if !wire.closed {
            wire.in_flight.push_back(msg);
        }
        PipeStatus::Release
    }

    fn recv(&mut self) -> Option<(Message, PipeStatus)> {
        let mut wire = self.rx.borrow_mut();
        let msg = wire.arrived.pop_front()?;
        Some((msg, PipeStatus::after_recv(wire.arrived.len())))
    }

    fn recv_priority(&self) -> u8 {
        self.priority
    }
}

/// Handle to a socket owned by a [`Mesh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its mesh
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Transport-side view of one end of a link
#[derive(Debug)]
struct Endpoint {
    node: NodeId,
    pipe: PipeId,
    handle: MemoryPipe,
}

/// A set of sockets joined by in-memory pipes
#[derive(Debug)]
pub struct Mesh<S> {
    nodes: Vec<S>,
    links: Vec<[Endpoint; 2]>,
}

impl<S: Socket<MemoryPipe>> Mesh<S> {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Add a socket
    pub fn add_node(&mut self, socket: S) -> NodeId {
        self.nodes.push(socket);
        NodeId(self.nodes.len() - 1)
    }

    /// Number of sockets
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Borrow a socket
    ///
    /// # Panics
    ///
    /// Panics if the node does not belong to this mesh.
    pub fn node(&self, id: NodeId) -> &S {
        &self.nodes[id.0]
    }

    /// Borrow a socket mutably
    ///
    /// # Panics
    ///
    /// Panics if the node does not belong to this mesh.
    pub fn node_mut(&mut self, id: NodeId) -> &mut S {
        &mut self.nodes[id.0]
    }

    /// Connect two sockets with default-priority pipes
    ///
    /// # Errors
    ///
    /// See [`Mesh::connect_with`].
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<(PipeId, PipeId), Error> {
        let (end_a, end_b) = MemoryPipe::pair();
        self.connect_with(a, b, end_a, end_b)
    }

    /// Connect two sockets with a prepared pipe pair
    ///
    /// Returns the pipe handles as seen by `a` and by `b`.
    ///
    /// # Errors
    ///
    /// - [`Error::IncompatiblePeer`] if either socket refuses the other's
    ///   protocol
    /// - errors from attaching either end; nothing stays attached then
    pub fn connect_with(
        &mut self,
        a: NodeId,
        b: NodeId,
        end_a: MemoryPipe,
        end_b: MemoryPipe,
    ) -> Result<(PipeId, PipeId), Error> {
        let (proto_a, proto_b) = (self.node(a).protocol(), self.node(b).protocol());
        if !self.node(a).accepts_peer(proto_b) || !self.node(b).accepts_peer(proto_a) {
            return Err(Error::IncompatiblePeer {
                local: proto_a,
                remote: proto_b,
            });
        }

        let pipe_a = self.node_mut(a).attach(end_a.clone())?;
        let pipe_b = match self.node_mut(b).attach(end_b.clone()) {
            Ok(id) => id,
            Err(err) => {
                self.node_mut(a).detach(pipe_a);
                return Err(err);
            }
        };

        tracing::debug!("Mesh: linked {}/{} <-> {}/{}", a, pipe_a, b, pipe_b);
        self.links.push([
            Endpoint {
                node: a,
                pipe: pipe_a,
                handle: end_a,
            },
            Endpoint {
                node: b,
                pipe: pipe_b,
                handle: end_b,
            },
        ]);
        Ok((pipe_a, pipe_b))
    }

    /// Tear down the link `pipe` belongs to on `node`, detaching both ends
    ///
    /// Returns `false` if no such link exists.
    pub fn disconnect(&mut self, node: NodeId, pipe: PipeId) -> bool {
        let Some(pos) = self
            .links
            .iter()
            .position(|link| link.iter().any(|ep| ep.node == node && ep.pipe == pipe))
        else {
            return false;
        };

        let link = self.links.swap_remove(pos);
        for ep in &link {
            ep.handle.close();
            self.nodes[ep.node.0].detach(ep.pipe);
        }
        tracing::debug!("Mesh: unlinked {}/{}", node, pipe);
        true
    }

    /// Run one round of transport activity
    ///
    /// Returns the number of readiness signals delivered.
    pub fn pump(&mut self) -> usize {
        for ep in self.links.iter().flatten() {
            ep.handle.flush();
        }

        let mut signals = 0;
        for ep in self.links.iter().flatten() {
            if ep.handle.poll_writable() {
                signals += 1;
                if let Err(err) = self.nodes[ep.node.0].mark_writable(ep.pipe) {
                    tracing::warn!("Mesh: write-ready on {} failed: {}", ep.node, err);
                }
            }
        }
        for ep in self.links.iter().flatten() {
            if ep.handle.poll_readable() {
                signals += 1;
                if let Err(err) = self.nodes[ep.node.0].mark_readable(ep.pipe) {
                    tracing::warn!("Mesh: read-ready on {} failed: {}", ep.node, err);
                }
            }
        }
        signals
    }

    /// Pump until no signal is delivered, at most [`SETTLE_ROUNDS`] times
    ///
    /// Returns the number of rounds that delivered signals.
    pub fn settle(&mut self) -> usize {
        let mut rounds = 0;
        while rounds < SETTLE_ROUNDS && self.pump() > 0 {
            rounds += 1;
        }
        rounds
    }

    /// Receive every message currently available on a socket
    pub fn drain(&mut self, node: NodeId) -> Vec<Message> {
        std::iter::from_fn(|| self.node_mut(node).recv()).collect()
    }
}

impl<S: Socket<MemoryPipe>> Default for Mesh<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooked::Router;
    use crate::distributor::RegistrationStage;
    use crate::name::PeerName;
    use crate::options::RouterConfig;

    fn named(name: &str) -> Router<MemoryPipe> {
        Router::with_config(&RouterConfig::named(name)).unwrap()
    }

    #[test]
    fn test_pipe_send_releases() {
        let (mut a, b) = MemoryPipe::pair();
        assert_eq!(a.send(Message::from("x")), PipeStatus::Release);
        assert_eq!(a.in_flight(), 1);
        assert_eq!(b.queued(), 0);

        assert_eq!(a.flush(), 1);
        assert_eq!(b.queued(), 1);
        assert!(a.poll_writable());
        assert!(!a.poll_writable());
        assert!(b.poll_readable());
        assert!(!b.poll_readable());
    }

    #[test]
    fn test_pipe_initially_writable() {
        let (a, b) = MemoryPipe::pair();
        assert!(a.poll_writable());
        assert!(b.poll_writable());
        assert!(!a.poll_readable());
    }

    #[test]
    fn test_pipe_recv_release_on_drain() {
        let (mut a, mut b) = MemoryPipe::pair();
        a.send(Message::from("1"));
        a.send(Message::from("2"));
        a.flush();

        let (first, status) = b.recv().unwrap();
        assert_eq!(first.body().as_ref(), b"1");
        assert_eq!(status, PipeStatus::Continue);
        let (_, status) = b.recv().unwrap();
        assert_eq!(status, PipeStatus::Release);
        assert!(b.recv().is_none());
    }

    #[test]
    fn test_closed_pipe_drops_sends() {
        let (mut a, b) = MemoryPipe::pair();
        b.close();
        assert!(a.is_closed());
        assert_eq!(a.send(Message::from("lost")), PipeStatus::Release);
        assert_eq!(a.flush(), 0);
        assert!(!a.poll_writable());
    }

    #[test]
    fn test_mesh_handshake() {
        let mut mesh = Mesh::new();
        let a = mesh.add_node(named("AAAA"));
        let b = mesh.add_node(named("BBBB"));
        let (pa, pb) = mesh.connect(a, b).unwrap();

        mesh.settle();
        assert_eq!(mesh.node(a).output_len(), 1);
        assert_eq!(mesh.node(b).output_len(), 1);

        // Announcements are consumed, not delivered.
        assert!(mesh.drain(a).is_empty());
        assert!(mesh.drain(b).is_empty());
        assert_eq!(
            mesh.node(a).stage(pa),
            Some(RegistrationStage::Eligible(Some(PeerName::from("BBBB"))))
        );
        assert_eq!(
            mesh.node(b).stage(pb),
            Some(RegistrationStage::Eligible(Some(PeerName::from("AAAA"))))
        );
    }

    #[test]
    fn test_mesh_named_delivery() {
        let mut mesh = Mesh::new();
        let a = mesh.add_node(named("AAAA"));
        let b = mesh.add_node(named("BBBB"));
        mesh.connect(a, b).unwrap();
        mesh.settle();
        mesh.drain(a);
        mesh.drain(b);

        mesh.node_mut(a).send(Message::from("BBBBping")).unwrap();
        mesh.settle();
        let got = mesh.drain(b);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].body().as_ref(), b"BBBBping");
        assert!(!got[0].has_header());

        // Not addressed to A's peer name.
        mesh.node_mut(b).send(Message::from("CCCCping")).unwrap();
        mesh.settle();
        assert!(mesh.drain(a).is_empty());
    }

    #[test]
    fn test_mesh_disconnect() {
        let mut mesh = Mesh::new();
        let a = mesh.add_node(named("AAAA"));
        let b = mesh.add_node(named("BBBB"));
        let (pa, _) = mesh.connect(a, b).unwrap();
        mesh.settle();

        assert!(mesh.disconnect(a, pa));
        assert!(!mesh.disconnect(a, pa));
        assert_eq!(mesh.link_count(), 0);
        assert_eq!(mesh.node(a).output_len(), 0);
        assert_eq!(mesh.node(b).output_len(), 0);
        assert_eq!(mesh.pump(), 0);
    }

    #[test]
    fn test_mesh_rejects_bad_priority() {
        let mut mesh = Mesh::new();
        let a = mesh.add_node(named("AAAA"));
        let b = mesh.add_node(named("BBBB"));
        let (end_a, end_b) = MemoryPipe::pair();

        let result = mesh.connect_with(a, b, end_a, end_b.with_priority(17));
        assert_eq!(result, Err(Error::InvalidPriority(17)));
        assert_eq!(mesh.link_count(), 0);
        assert_eq!(mesh.node(a).as_raw().pipe_count(), 0);
    }

    #[test]
    fn test_settle_is_bounded() {
        let mut mesh: Mesh<Router<MemoryPipe>> = Mesh::new();
        mesh.add_node(named("AAAA"));
        assert_eq!(mesh.settle(), 0);
    }
}
