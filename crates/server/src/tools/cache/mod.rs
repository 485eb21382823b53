//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and trimming the worker's buckets.

pub mod buckets;
pub mod cleanup;

pub use buckets::buckets_impl;
pub use cleanup::{CacheCleanupParams, cleanup_impl};
