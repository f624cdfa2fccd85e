//! Caching translation proxy.
//!
//! Resolves language names or tags against a provider-supplied catalog,
//! answers repeated requests from a local SQLite cache, and forwards
//! misses to the translation provider.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod google;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod retry;
pub mod scheduler;
pub mod server;
pub mod translator;
