//! Storage layer for Glowcart
//!
//! This crate provides durable, versioned file storage used to keep
//! small pieces of client state (such as the signed-in session) across
//! application restarts.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod versioned_file;

pub use versioned_file::{FileStoreConfig, PersistenceError, VersionedFile};
