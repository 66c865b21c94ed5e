//! Push transport abstraction and an in-memory loopback implementation.
//!
//! A transport hands back a [`Link`]: a sending half plus a queue of
//! [`TransportEvent`]s. The status channel only ever drains that queue, so
//! its merge logic can be driven by synthetic events without a network.

use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{InboxError, Result};

/// Something that happened on a push connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection finished establishing.
    Opened,
    /// A text frame arrived from the server.
    Frame(String),
    /// The server closed the connection.
    Closed,
    /// The connection failed.
    Failed(String),
}

/// Sending half of a push connection.
pub trait Connection {
    /// Send a text frame to the server.
    fn send(&mut self, frame: &str) -> Result<()>;

    /// Close the connection. Must be safe to call more than once.
    fn close(&mut self);
}

/// An established (or establishing) connection and its inbound queue.
pub struct Link {
    pub connection: Box<dyn Connection>,
    pub events: Receiver<TransportEvent>,
}

/// Opens push connections.
pub trait Transport {
    fn connect(&mut self) -> Result<Link>;
}

/// Loopback transport: every connection is a pair of in-process queues.
///
/// Clones share state, so a test can keep a handle while the channel owns
/// another, and inject frames or inspect what was sent.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    peers: Vec<Peer>,
    /// Leave new connections in the establishing state until `open` is called.
    manual_open: bool,
    refuse_next: Option<String>,
}

struct Peer {
    tx: Sender<TransportEvent>,
    sent: Vec<String>,
    closed: bool,
}

impl MemoryTransport {
    /// Connections report `Opened` as soon as they are created.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections stay establishing until [`MemoryTransport::open`].
    pub fn manual() -> Self {
        let transport = Self::default();
        transport.state().manual_open = true;
        transport
    }

    /// Make the next `connect` call fail with `reason`.
    pub fn refuse_next(&self, reason: impl Into<String>) {
        self.state().refuse_next = Some(reason.into());
    }

    /// Complete establishment of connection `index`.
    pub fn open(&self, index: usize) {
        self.emit(index, TransportEvent::Opened);
    }

    /// Deliver a text frame on connection `index`.
    pub fn push_frame(&self, index: usize, frame: impl Into<String>) {
        self.emit(index, TransportEvent::Frame(frame.into()));
    }

    /// Deliver a text frame on the most recent connection.
    pub fn push_to_latest(&self, frame: impl Into<String>) {
        let latest = self.connection_count().saturating_sub(1);
        self.push_frame(latest, frame);
    }

    /// Simulate a transport failure on connection `index`.
    pub fn fail(&self, index: usize, reason: impl Into<String>) {
        self.emit(index, TransportEvent::Failed(reason.into()));
    }

    /// Number of connections ever created.
    pub fn connection_count(&self) -> usize {
        self.state().peers.len()
    }

    /// Indices of connections the client has not closed.
    pub fn live_connections(&self) -> Vec<usize> {
        self.state()
            .peers
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.closed)
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether the client closed connection `index`.
    pub fn is_closed(&self, index: usize) -> bool {
        self.state().peers.get(index).is_some_and(|p| p.closed)
    }

    /// Frames the client sent on connection `index`.
    pub fn sent_frames(&self, index: usize) -> Vec<String> {
        self.state()
            .peers
            .get(index)
            .map(|p| p.sent.clone())
            .unwrap_or_default()
    }

    fn emit(&self, index: usize, event: TransportEvent) {
        if let Some(peer) = self.state().peers.get(index) {
            // The receiving side may already be gone; nothing to deliver to then
            let _ = peer.tx.send(event);
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self) -> Result<Link> {
        let mut state = self.state();
        if let Some(reason) = state.refuse_next.take() {
            return Err(InboxError::Transport(reason));
        }

        let (tx, rx) = unbounded();
        if !state.manual_open {
            let _ = tx.send(TransportEvent::Opened);
        }
        state.peers.push(Peer {
            tx,
            sent: Vec::new(),
            closed: false,
        });
        let index = state.peers.len() - 1;
        drop(state);

        Ok(Link {
            connection: Box::new(MemoryConnection {
                inner: Arc::clone(&self.inner),
                index,
            }),
            events: rx,
        })
    }
}

struct MemoryConnection {
    inner: Arc<Mutex<MemoryState>>,
    index: usize,
}

impl MemoryConnection {
    fn with_peer<R>(&self, f: impl FnOnce(&mut Peer) -> R) -> R {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state.peers[self.index])
    }
}

impl Connection for MemoryConnection {
    fn send(&mut self, frame: &str) -> Result<()> {
        self.with_peer(|peer| {
            if peer.closed {
                return Err(InboxError::Transport("connection is closed".into()));
            }
            peer.sent.push(frame.to_string());
            Ok(())
        })
    }

    fn close(&mut self) {
        self.with_peer(|peer| peer.closed = true);
    }
}
