//! Dispatcher
//!
//! The single owner of server-wide mutable state. Peers reach it only
//! through channels, and it handles exactly one event at a time:
//!
//! - **register**: a new peer joins the peer set
//! - **remove**: a disconnected peer leaves the peer set
//! - **message**: a frame is decoded and executed against the store
//! - **shutdown**: every peer is closed and the loop exits
//!
//! The register, remove and message channels are rendezvous channels
//! (`bounded(0)`): a peer's handoff completes only when the dispatcher takes
//! the event, so frames from one connection are handled in stream order and
//! nothing queues up unbounded.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam::channel::{bounded, select, Receiver, Sender, TrySendError};
use tracing::{debug, info, trace, warn};

use super::peer::{Peer, PeerId};
use crate::error::{KvError, Result};
use crate::protocol::{decode, encode_reply, Command};
use crate::store::KvStore;

/// One frame read from a peer
#[derive(Debug, Clone)]
pub struct Message {
    payload: Bytes,
    peer_id: PeerId,
    peer: Weak<Peer>,
}

impl Message {
    pub fn new(payload: Bytes, peer: &Arc<Peer>) -> Self {
        Self {
            payload,
            peer_id: peer.id(),
            peer: Arc::downgrade(peer),
        }
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// The originating peer, if it is still alive
    pub fn peer(&self) -> Option<Arc<Peer>> {
        self.peer.upgrade()
    }
}

/// The peer set
///
/// Only the dispatcher can change it; everyone else gets it back read-only
/// once the dispatcher has stopped.
#[derive(Debug, Default)]
pub struct ServerState {
    peers: HashMap<PeerId, Arc<Peer>>,
}

impl ServerState {
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    fn insert(&mut self, peer: Arc<Peer>) -> bool {
        self.peers.insert(peer.id(), peer).is_none()
    }

    fn remove(&mut self, id: PeerId) -> bool {
        self.peers.remove(&id).is_some()
    }

    fn close_all(&self) {
        for peer in self.peers.values() {
            peer.close();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatcherStatus {
    Running,
    Stopped,
}

/// Cloneable sending side of the dispatcher's channels
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    register_tx: Sender<Arc<Peer>>,
    remove_tx: Sender<PeerId>,
    message_tx: Sender<Message>,
    shutdown_tx: Sender<()>,
}

impl DispatcherHandle {
    /// Add a peer to the peer set; returns once the dispatcher has taken it
    pub fn register(&self, peer: Arc<Peer>) -> Result<()> {
        self.register_tx.send(peer).map_err(|_| stopped())
    }

    /// Drop a peer from the peer set
    pub fn remove(&self, id: PeerId) -> Result<()> {
        self.remove_tx.send(id).map_err(|_| stopped())
    }

    /// Hand a frame to the dispatcher, blocking until it is taken
    pub fn submit(&self, message: Message) -> Result<()> {
        self.message_tx.send(message).map_err(|_| stopped())
    }

    /// Ask the dispatcher to stop. Never blocks; repeated calls are no-ops.
    pub fn shutdown(&self) {
        match self.shutdown_tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => debug!("dispatcher already stopped"),
        }
    }
}

fn stopped() -> KvError {
    KvError::Disconnected("dispatcher stopped".to_string())
}

/// Receiving side, dropped together with the dispatcher loop so blocked
/// peers see a disconnect instead of waiting forever.
struct Inbox {
    register_rx: Receiver<Arc<Peer>>,
    remove_rx: Receiver<PeerId>,
    message_rx: Receiver<Message>,
    shutdown_rx: Receiver<()>,
}

/// The event loop that owns the peer set and executes commands
pub struct Dispatcher {
    store: Arc<KvStore>,

    state: ServerState,

    status: DispatcherStatus,

    inbox: Inbox,
}

impl Dispatcher {
    /// Create a dispatcher over `store` and the handle used to reach it
    pub fn new(store: Arc<KvStore>) -> (Self, DispatcherHandle) {
        let (register_tx, register_rx) = bounded(0);
        let (remove_tx, remove_rx) = bounded(0);
        let (message_tx, message_rx) = bounded(0);
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let dispatcher = Self {
            store,
            state: ServerState::default(),
            status: DispatcherStatus::Running,
            inbox: Inbox {
                register_rx,
                remove_rx,
                message_rx,
                shutdown_rx,
            },
        };

        let handle = DispatcherHandle {
            register_tx,
            remove_tx,
            message_tx,
            shutdown_tx,
        };

        (dispatcher, handle)
    }

    /// Run the loop on its own thread
    ///
    /// Joining yields the final peer set.
    pub fn spawn(self) -> Result<JoinHandle<ServerState>> {
        let handle = thread::Builder::new()
            .name("dispatcher".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// Process events until shutdown (blocking)
    pub fn run(mut self) -> ServerState {
        info!("dispatcher running");

        while self.status == DispatcherStatus::Running {
            select! {
                recv(self.inbox.register_rx) -> peer => match peer {
                    Ok(peer) => self.register(peer),
                    Err(_) => self.stop(),
                },
                recv(self.inbox.remove_rx) -> id => match id {
                    Ok(id) => self.remove(id),
                    Err(_) => self.stop(),
                },
                recv(self.inbox.message_rx) -> message => match message {
                    Ok(message) => {
                        let peer_id = message.peer_id();
                        if let Err(e) = self.handle_message(message) {
                            report(peer_id, &e);
                        }
                    }
                    Err(_) => self.stop(),
                },
                recv(self.inbox.shutdown_rx) -> _ => self.stop(),
            }
        }

        info!(peers = self.state.len(), keys = self.store.len(), "dispatcher stopped");
        self.state
    }

    fn register(&mut self, peer: Arc<Peer>) {
        let id = peer.id();
        if !self.state.insert(peer) {
            warn!(peer = id, "peer registered twice");
        }
        debug!(peer = id, peers = self.state.len(), "peer added");
    }

    fn remove(&mut self, id: PeerId) {
        if self.state.remove(id) {
            debug!(peer = id, peers = self.state.len(), "peer removed");
        } else {
            debug!(peer = id, "removal for unknown peer");
        }
    }

    fn stop(&mut self) {
        self.status = DispatcherStatus::Stopped;
        self.state.close_all();
    }

    /// Decode and execute one frame
    fn handle_message(&mut self, message: Message) -> Result<()> {
        let command = decode(message.payload())?;
        trace!(
            peer = message.peer_id(),
            command = command.name(),
            key = command.key(),
            "executing"
        );
        self.execute(command, message.peer())
    }

    /// Run a command against the store, answering through `peer`
    fn execute(&self, command: Command, peer: Option<Arc<Peer>>) -> Result<()> {
        match command {
            Command::Set { key, value } => self.store.set(key, value),
            Command::Get { key } => {
                let value = self
                    .store
                    .get(&key)
                    .ok_or_else(|| KvError::KeyNotFound(key.clone()))?;

                match peer {
                    Some(peer) => {
                        peer.send(&encode_reply(&value))?;
                    }
                    None => debug!(key = %key, "peer gone, dropping reply"),
                }
                Ok(())
            }
        }
    }
}

/// Log a per-message failure. None of these end the connection.
fn report(peer: PeerId, error: &KvError) {
    match error {
        KvError::KeyNotFound(_) => debug!(peer, error = %error, "GET miss"),
        e if e.is_protocol() => warn!(peer, error = %e, "dropping bad frame"),
        e => warn!(peer, error = %e, "command failed"),
    }
}
