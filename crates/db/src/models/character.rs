//! One leaderboard row per playable character.

use serde::Serialize;
use sqlx::FromRow;

/// A character as extracted from the source store and stored in the derived
/// leaderboard table. The same shape is served to readers.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSnapshot {
    /// Unique key.
    pub name: String,
    pub job: i32,
    pub level: i32,
    pub fame: i32,
    /// In-game currency; routinely exceeds 32-bit range.
    pub meso: i64,
    pub dog_points: i32,
    pub fish_points: i32,
}
