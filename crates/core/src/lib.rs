//! Domain logic shared by the sync pipeline and the read API.
//!
//! This crate has no database dependency: everything here operates on
//! values handed in by the caller.

pub mod config;
pub mod error;
pub mod leaderboard;
pub mod status;
pub mod types;
