//! TCP Server
//!
//! Accepts connections and hands each one to its own peer thread.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{error, info, warn};

use super::dispatcher::{Dispatcher, DispatcherHandle};
use super::peer::PeerConnection;
use crate::config::Config;
use crate::error::Result;
use crate::store::KvStore;

/// TCP server for dispatchkv
pub struct Server {
    config: Config,

    listener: TcpListener,

    store: Arc<KvStore>,

    dispatcher: Dispatcher,

    handle: DispatcherHandle,
}

impl Server {
    /// Bind the listen address and prepare the dispatcher
    ///
    /// Nothing runs until [`Server::run`].
    pub fn bind(config: Config, store: Arc<KvStore>) -> Result<Self> {
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr)?;
        let (dispatcher, handle) = Dispatcher::new(Arc::clone(&store));

        Ok(Self {
            config,
            listener,
            store,
            dispatcher,
            handle,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for signalling the dispatcher
    pub fn dispatcher(&self) -> DispatcherHandle {
        self.handle.clone()
    }

    pub fn store(&self) -> &Arc<KvStore> {
        &self.store
    }

    /// Start the dispatcher and accept connections (blocking)
    ///
    /// Accept errors are logged and never end the loop.
    pub fn run(self) -> Result<()> {
        let Server {
            config,
            listener,
            dispatcher,
            handle,
            ..
        } = self;

        dispatcher.spawn()?;
        info!("server started on {}", listener.local_addr()?);

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => spawn_peer(stream, &handle, &config),
                Err(e) => error!(error = %e, "accept error"),
            }
        }

        Ok(())
    }
}

fn spawn_peer(stream: TcpStream, handle: &DispatcherHandle, config: &Config) {
    let conn = match PeerConnection::new(stream, handle.clone(), config) {
        Ok(conn) => conn,
        Err(e) => {
            warn!(error = %e, "failed to set up connection");
            return;
        }
    };

    let id = conn.peer().id();
    let addr = conn.peer().addr().to_string();
    info!(peer = id, addr = %addr, "accepted connection");

    let spawned = thread::Builder::new()
        .name(format!("peer-{}", id))
        .spawn(move || {
            if let Err(e) = conn.run() {
                warn!(peer = id, addr = %addr, error = %e, "peer read loop ended with error");
            }
        });

    if let Err(e) = spawned {
        error!(peer = id, error = %e, "failed to spawn peer thread");
    }
}
