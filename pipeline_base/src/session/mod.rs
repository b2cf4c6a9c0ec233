//! # Session merge protocol
//!
//! Sessions are JSON objects kept in a [`KeyValueStore`]. Strategies read a
//! [`Session`] snapshot and return a [`Delta`]; the [`SessionManager`] merges
//! deltas back with [`merge_delta`] or [`merge_list_item`].

pub mod errors;
pub mod manager;
pub mod merge;
pub mod store;
pub mod types;

pub use errors::{SessionError, StoreError};
pub use manager::SessionManager;
pub use merge::{merge_delta, merge_list_item};
pub use store::{InMemoryStore, KeyValueStore};
pub use types::{Delta, Session, SessionId};
