//! Test fixtures for routing-socket scenarios
//!
//! - [`ManualPeer`]: drive a single socket by hand, playing the remote end
//!   of one of its pipes
//! - [`PairFixture`]: two sockets joined over a [`Mesh`] with the naming
//!   handshake already complete
//!
//! # Example
//!
//! ```no_run
//! use nanomesh_core::{Message, RawRouter, Socket};
//! use nanomesh_integration_tests::fixtures::ManualPeer;
//!
//! let mut router = RawRouter::new();
//! let (mut peer, pipe) = ManualPeer::connect();
//! let id = router.attach(pipe).unwrap();
//!
//! peer.inject("ABCD1234");
//! router.mark_readable(id).unwrap();
//! ```

use bytes::Bytes;
use nanomesh_core::{
    MemoryPipe, Mesh, Message, NodeId, Pipe, PipeId, RawRouter, Router, RouterConfig, Socket,
};

/// The remote end of one pipe, operated directly by a test
pub struct ManualPeer {
    /// Clone of the end the socket owns
    near: MemoryPipe,
    /// The end the test plays
    far: MemoryPipe,
}

impl ManualPeer {
    /// Create a peer and the pipe to attach to the socket under test
    pub fn connect() -> (Self, MemoryPipe) {
        let (near, far) = MemoryPipe::pair();
        let peer = Self {
            near: near.clone(),
            far,
        };
        (peer, near)
    }

    /// Create a peer whose socket-side pipe reports `priority`
    pub fn connect_with_priority(priority: u8) -> (Self, MemoryPipe) {
        let (peer, near) = Self::connect();
        (peer, near.with_priority(priority))
    }

    /// Deliver a message body to the socket side
    ///
    /// The socket still has to be told the pipe is readable.
    pub fn inject(&mut self, body: impl Into<Bytes>) {
        self.inject_message(Message::new(body));
    }

    /// Deliver a full message, header included, to the socket side
    pub fn inject_message(&mut self, msg: Message) {
        self.far.send(msg);
        self.far.flush();
    }

    /// Everything the socket has sent on this pipe so far
    pub fn received(&mut self) -> Vec<Message> {
        self.near.flush();
        std::iter::from_fn(|| self.far.recv().map(|(msg, _)| msg)).collect()
    }

    /// Bodies of everything the socket has sent so far
    pub fn received_bodies(&mut self) -> Vec<Bytes> {
        self.received()
            .into_iter()
            .map(|msg| msg.body().clone())
            .collect()
    }
}

/// Drive a pipe through both write-ready steps so it is linked
pub fn link<S: Socket<MemoryPipe>>(socket: &mut S, id: PipeId) {
    socket.mark_writable(id).unwrap();
    socket.mark_writable(id).unwrap();
}

/// Attach a pipe, link it and register `name` as the peer's name
///
/// The announcement the socket sent is discarded.
pub fn attach_named<S: Socket<MemoryPipe>>(
    socket: &mut S,
    name: &'static str,
) -> (ManualPeer, PipeId) {
    let (mut peer, pipe) = ManualPeer::connect();
    let id = socket.attach(pipe).unwrap();
    link(socket, id);
    peer.inject(name);
    socket.mark_readable(id).unwrap();
    assert!(socket.recv().is_none(), "announcement must be consumed");
    peer.received();
    (peer, id)
}

/// Two sockets joined by one link, handshake complete
pub struct PairFixture<S> {
    pub mesh: Mesh<S>,
    pub left: NodeId,
    pub right: NodeId,
    /// The link as seen by `left`
    pub left_pipe: PipeId,
    /// The link as seen by `right`
    pub right_pipe: PipeId,
}

impl<S: Socket<MemoryPipe>> PairFixture<S> {
    /// Join two sockets and complete the naming handshake
    pub fn new(left: S, right: S) -> Self {
        let mut mesh = Mesh::new();
        let left = mesh.add_node(left);
        let right = mesh.add_node(right);
        let (left_pipe, right_pipe) = mesh.connect(left, right).unwrap();
        mesh.settle();
        assert!(mesh.drain(left).is_empty());
        assert!(mesh.drain(right).is_empty());
        Self {
            mesh,
            left,
            right,
            left_pipe,
            right_pipe,
        }
    }

    /// Send from one side, let the mesh settle and collect what the other
    /// side receives
    pub fn exchange(&mut self, from: NodeId, body: &'static str) -> Vec<Message> {
        let to = if from == self.left { self.right } else { self.left };
        self.mesh.node_mut(from).send(Message::from(body)).unwrap();
        self.mesh.settle();
        self.mesh.drain(to)
    }
}

impl PairFixture<Router<MemoryPipe>> {
    /// Two cooked routers with the given local names
    pub fn cooked(left: &str, right: &str) -> Self {
        Self::new(router(left), router(right))
    }
}

impl PairFixture<RawRouter<MemoryPipe>> {
    /// Two raw routers with the given local names
    pub fn raw(left: &str, right: &str) -> Self {
        Self::new(raw_router(left), raw_router(right))
    }
}

/// Cooked router with a local name
pub fn router(name: &str) -> Router<MemoryPipe> {
    Router::with_config(&RouterConfig::named(name)).unwrap()
}

/// Raw router with a local name
pub fn raw_router(name: &str) -> RawRouter<MemoryPipe> {
    RawRouter::with_config(&RouterConfig::named(name)).unwrap()
}

/// Body of a message as text, for assertions
pub fn text(msg: &Message) -> String {
    String::from_utf8_lossy(msg.body()).into_owned()
}
