//! Client
//!
//! Blocking client that keeps one connection open across calls. A mutex
//! serializes callers so requests and replies on the shared socket never
//! interleave.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{KvError, Result};
use crate::protocol::{encode_command, Command};

pub struct Client {
    config: ClientConfig,

    /// Dialled on first use, dropped on any I/O failure
    conn: Mutex<Option<TcpStream>>,
}

impl Client {
    /// Client for the server at `addr` with default settings
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::new(addr))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            conn: Mutex::new(None),
        }
    }

    /// Store `value` under `key`
    ///
    /// The server sends no acknowledgement, so this returns as soon as the
    /// frame is written.
    pub fn set(&self, key: &str, value: impl Into<Bytes>) -> Result<()> {
        let frame = encode_command(&Command::set(key, value));
        let mut conn = self.conn.lock();
        self.write(&mut conn, &frame)
    }

    /// Fetch the value stored under `key`
    ///
    /// Performs a single read of at most `reply_buffer_size` bytes, so a
    /// longer value comes back truncated. The server writes nothing for an
    /// absent key, so a read timeout is reported as [`KvError::KeyNotFound`].
    pub fn get(&self, key: &str) -> Result<Bytes> {
        let frame = encode_command(&Command::get(key));
        let mut conn = self.conn.lock();
        self.write(&mut conn, &frame)?;

        let stream = match conn.as_mut() {
            Some(stream) => stream,
            None => return Err(KvError::Disconnected("connection dropped".to_string())),
        };

        let mut buf = vec![0u8; self.config.reply_buffer_size];
        let result = stream.read(&mut buf);

        match result {
            Ok(0) => {
                *conn = None;
                Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )
                .into())
            }
            Ok(n) => {
                if n == buf.len() {
                    // The rest of the reply may still be in the socket.
                    debug!(key = %key, bytes = n, "reply filled the buffer, dropping connection");
                    *conn = None;
                }
                buf.truncate(n);
                Ok(Bytes::from(buf))
            }
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                // A reply arriving after the deadline must not be read as the
                // answer to the next request.
                *conn = None;
                Err(KvError::KeyNotFound(key.to_string()))
            }
            Err(e) => {
                *conn = None;
                Err(e.into())
            }
        }
    }

    fn write(&self, conn: &mut Option<TcpStream>, bytes: &[u8]) -> Result<()> {
        if conn.is_none() {
            *conn = Some(self.dial()?);
        }

        let written = match conn.as_mut() {
            Some(stream) => stream.write_all(bytes).and_then(|()| stream.flush()),
            None => return Err(KvError::Disconnected("connection dropped".to_string())),
        };

        if let Err(e) = written {
            debug!(server = %self.config.server_addr, error = %e, "write failed, dropping connection");
            *conn = None;
            return Err(e.into());
        }
        Ok(())
    }

    fn dial(&self) -> Result<TcpStream> {
        let stream = TcpStream::connect(&self.config.server_addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.config.read_timeout.max(Duration::from_millis(1))))?;
        debug!(server = %self.config.server_addr, "connected");
        Ok(stream)
    }
}
