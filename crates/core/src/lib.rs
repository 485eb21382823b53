//! Core types and caching logic for the swcache worker.
//!
//! This crate provides:
//! - Bucket store with SQLite backend
//! - Request router and caching strategies
//! - Cache manager (eviction, stale version cleanup)
//! - Worker lifecycle (install/activate)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod lifecycle;
pub mod manager;
pub mod router;
pub mod strategy;
pub mod worker;

pub use cache::{CacheDb, CacheEntry};
pub use config::{AppConfig, WorkerConfig};
pub use error::Error;
pub use fetch::{Destination, Fetcher, Request, Response, ResponseSource};
pub use lifecycle::{LifecycleController, LifecycleState, LifecycleStatus};
pub use manager::CacheManager;
pub use router::{RequestRouter, Route};
pub use strategy::{StrategyConfig, StrategyExecutor, StrategyKind};
pub use worker::{ServiceWorker, WorkerMessage};
