//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Accept loop on the calling thread
//! - One read-loop thread per connection ([`PeerConnection`])
//! - One [`Dispatcher`] thread owning the peer set and executing commands

mod dispatcher;
mod peer;
mod server;

pub use dispatcher::{Dispatcher, DispatcherHandle, Message, ServerState};
pub use peer::{Peer, PeerConnection, PeerId};
pub use server::Server;
