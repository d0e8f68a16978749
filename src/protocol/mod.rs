//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (RESP subset)
//!
//! Requests are arrays of bulk strings:
//! ```text
//! *<count>\r\n
//! $<len>\r\n<bytes>\r\n      (repeated <count> times)
//! ```
//!
//! ### Commands
//! - `SET key value` - no reply
//! - `GET key`       - raw value bytes, or nothing when the key is absent
//!
//! ### Framing
//! A socket read is not a frame. [`FrameBuffer`] collects reads and hands
//! out one complete frame at a time; [`decode`] turns a frame into a
//! [`Command`].

mod buffer;
mod codec;
mod command;
mod frame;

pub use buffer::FrameBuffer;
pub use codec::{decode, encode_command, encode_reply};
pub use command::Command;
pub use frame::{CheckProgress, Frame, FrameError};
