//! shelfcache library
//!
//! Client-side caching for the grocery store staff task app: namespaced TTL
//! caches over a shared persistent store, a read-through wrapper with offline
//! fallback, persistent hit/miss metrics and a background cleanup scheduler.

pub mod app;
pub mod cache;
pub mod cached_client;
pub mod cleanup;
pub mod cli;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod remote;
pub mod store;
