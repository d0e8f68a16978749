//! Store Module
//!
//! In-memory key-value map shared by the dispatcher and anything else that
//! needs direct access.
//!
//! ## Responsibilities
//! - Last-writer-wins inserts and point lookups
//! - Concurrent readers, exclusive writers
//!
//! ## Data Structure Choice
//! A `HashMap` wrapped in a `parking_lot::RwLock`:
//! - No ordering semantics are needed, so no `BTreeMap`
//! - The lock is the store's own, independent of the dispatcher thread

mod table;

pub use table::KvStore;
