//! Read-only HTTP API over the leaderboard cache store.
//!
//! Exposes the building blocks (config, state, error handling, read cache,
//! query service, routes) so integration tests and the binary entrypoint
//! can both access them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod read_cache;
pub mod router;
pub mod routes;
pub mod service;
pub mod state;
