//! Storage backends for prefkit
//!
//! This crate provides persistent and cached preferences backends:
//! a sled key-value store, an LRU cache with TTL, and a versioned file.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod kv;
pub mod persistence;

pub use cache::{CacheConfig, CachePreferences};
pub use kv::{KvConfig, KvError, KvPreferences};
pub use persistence::{FileConfig, FileError, FilePreferences};
