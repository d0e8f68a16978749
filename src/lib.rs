//! # dispatchkv
//!
//! A minimal in-memory key-value server with:
//! - A RESP-style wire protocol (arrays of bulk strings)
//! - One read-loop thread per connection
//! - A single dispatcher thread that owns all server state
//! - A shared store guarded by its own reader/writer lock
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Accept Loop                              │
//! │                 (one thread per peer)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  register / message / remove
//!                       │  (rendezvous channels)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Dispatcher                               │
//! │        (owns peer set, one event at a time)                  │
//! └──────────┬───────────────────────────────┬──────────────────┘
//!            │ decode                        │ execute
//!            ▼                               ▼
//!   ┌─────────────────┐             ┌─────────────────┐
//!   │    Protocol     │             │     KvStore     │
//!   │ (FrameBuffer +  │             │    (RwLock)     │
//!   │     decode)     │             └─────────────────┘
//!   └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::{ClientConfig, Config};
pub use store::KvStore;
pub use network::Server;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of dispatchkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
