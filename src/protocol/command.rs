//! Command definitions
//!
//! Represents commands from clients.

use bytes::Bytes;

use super::Frame;

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a value under a key
    Set { key: String, value: Bytes },

    /// Read the value stored under a key
    Get { key: String },
}

impl Command {
    pub const SET: &'static str = "SET";
    pub const GET: &'static str = "GET";

    /// Build a SET command
    pub fn set(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Command::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build a GET command
    pub fn get(key: impl Into<String>) -> Self {
        Command::Get { key: key.into() }
    }

    /// The wire keyword
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => Self::SET,
            Command::Get { .. } => Self::GET,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. } | Command::Get { key } => key,
        }
    }

    /// The request frame for this command
    pub fn to_frame(&self) -> Frame {
        match self {
            Command::Set { key, value } => Frame::Array(vec![
                Frame::Bulk(Bytes::from_static(Self::SET.as_bytes())),
                Frame::Bulk(Bytes::copy_from_slice(key.as_bytes())),
                Frame::Bulk(value.clone()),
            ]),
            Command::Get { key } => Frame::Array(vec![
                Frame::Bulk(Bytes::from_static(Self::GET.as_bytes())),
                Frame::Bulk(Bytes::copy_from_slice(key.as_bytes())),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_key() {
        let set = Command::set("k", "v");
        assert_eq!(set.name(), "SET");
        assert_eq!(set.key(), "k");

        let get = Command::get("other");
        assert_eq!(get.name(), "GET");
        assert_eq!(get.key(), "other");
    }

    #[test]
    fn to_frame_is_an_array_of_bulk_strings() {
        assert_eq!(
            Command::set("k", "v").to_frame(),
            Frame::bulk_array(["SET", "k", "v"])
        );
    }
}
