//! Network side of the swcache worker.
//!
//! This crate provides the reqwest-backed [`HttpFetcher`] that the worker
//! uses for every network request, and URL canonicalization for requests
//! entering from the outside.

pub mod fetch;

pub use fetch::{FetchConfig, HttpFetcher, UrlError, canonicalize};
