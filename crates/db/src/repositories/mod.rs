//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod leaderboard_repo;
pub mod schema_repo;
pub mod server_status_repo;
pub mod session_repo;
pub mod source_character_repo;

pub use leaderboard_repo::LeaderboardRepo;
pub use schema_repo::SchemaRepo;
pub use server_status_repo::ServerStatusRepo;
pub use session_repo::SessionRepo;
pub use source_character_repo::SourceCharacterRepo;
