//! Peer Handler
//!
//! One accepted client connection: a shared write half the dispatcher
//! answers through, and a read loop that feeds the dispatcher.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::dispatcher::{DispatcherHandle, Message};
use crate::config::Config;
use crate::error::Result;
use crate::protocol::FrameBuffer;

/// Process-unique peer identity
pub type PeerId = u64;

static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

/// The write side of a client connection
///
/// Only the dispatcher writes, so replies never interleave.
#[derive(Debug)]
pub struct Peer {
    id: PeerId,

    /// Peer address for logging
    addr: String,

    stream: TcpStream,
}

impl Peer {
    fn new(stream: TcpStream, addr: String) -> Self {
        Self {
            id: NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed),
            addr,
            stream,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Write `data` to the client, returning the number of bytes written
    pub fn send(&self, data: &[u8]) -> Result<usize> {
        let mut stream = &self.stream;
        stream.write_all(data)?;
        stream.flush()?;
        Ok(data.len())
    }

    /// Shut the socket down in both directions
    ///
    /// The read loop then sees EOF and exits. Safe to call more than once.
    pub fn close(&self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!(peer = self.id, error = %e, "shutdown on closed socket");
        }
    }
}

/// Owns the read side of a connection and runs its read loop
pub struct PeerConnection {
    peer: Arc<Peer>,

    reader: TcpStream,

    frames: FrameBuffer,

    read_buffer_size: usize,

    dispatcher: DispatcherHandle,
}

impl PeerConnection {
    /// Wrap an accepted stream
    ///
    /// Disables Nagle's algorithm and splits the stream into the read half
    /// kept here and the write half shared as [`Peer`].
    pub fn new(stream: TcpStream, dispatcher: DispatcherHandle, config: &Config) -> Result<Self> {
        let addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;
        let write_stream = stream.try_clone()?;

        Ok(Self {
            peer: Arc::new(Peer::new(write_stream, addr)),
            reader: stream,
            frames: FrameBuffer::new(config.max_frame_size),
            read_buffer_size: config.read_buffer_size,
            dispatcher,
        })
    }

    pub fn peer(&self) -> &Arc<Peer> {
        &self.peer
    }

    /// Register, read until the connection ends, then deregister
    ///
    /// Blocks the calling thread for the lifetime of the connection.
    pub fn run(mut self) -> Result<()> {
        self.dispatcher.register(Arc::clone(&self.peer))?;
        debug!(peer = self.peer.id, addr = %self.peer.addr, "peer registered");

        let result = self.read_loop();

        // Whatever is left can't become a frame any more; let the decoder
        // report it rather than losing it silently.
        if let Some(rest) = self.frames.take_remaining() {
            if let Err(e) = self.dispatcher.submit(Message::new(rest, &self.peer)) {
                debug!(peer = self.peer.id, error = %e, "leftover bytes not delivered");
            }
        }

        self.peer.close();
        if let Err(e) = self.dispatcher.remove(self.peer.id) {
            debug!(peer = self.peer.id, error = %e, "removal not delivered");
        }
        debug!(peer = self.peer.id, addr = %self.peer.addr, "peer disconnected");

        result
    }

    fn read_loop(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            let n = match self.reader.read(&mut buf) {
                Ok(0) => {
                    debug!(peer = self.peer.id, "client closed connection");
                    return Ok(());
                }
                Ok(n) => n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                    ) =>
                {
                    debug!(peer = self.peer.id, error = %e, "connection reset by client");
                    return Ok(());
                }
                Err(e) => {
                    warn!(peer = self.peer.id, error = %e, "error reading from client");
                    return Err(e.into());
                }
            };

            trace!(peer = self.peer.id, bytes = n, "read");
            self.frames.extend(&buf[..n]);

            while let Some(frame) = self.frames.next_frame() {
                self.dispatcher.submit(Message::new(frame, &self.peer))?;
            }
        }
    }
}
