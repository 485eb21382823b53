//! SQLite-backed bucket store for cached responses.
//!
//! This module stands in for the browser's Cache Storage: a set of named
//! buckets, each holding responses keyed by request identity. It supports:
//!
//! - Request-addressed keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Per-bucket timestamp listing for eviction

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
