//! Leaderboard ranking selection and request normalisation.
//!
//! Ranking keys form a closed set; client input is only ever mapped onto a
//! [`RankingType`] and never reaches a query string.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Hard ceiling on rows per leaderboard page and per snapshot.
pub const MAX_LIMIT: i64 = 200;

/// Page size used when the caller gives no usable limit.
pub const DEFAULT_LIMIT: i64 = 50;

/// Longest name filter accepted; longer input is truncated.
pub const MAX_FILTER_CHARS: usize = 32;

// ---------------------------------------------------------------------------
// RankingType
// ---------------------------------------------------------------------------

/// The sort key a leaderboard page is ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingType {
    #[default]
    Level,
    Fame,
    Currency,
    Aux1,
    Aux2,
}

impl RankingType {
    /// All ranking types, in display order.
    pub const ALL: [RankingType; 5] = [
        RankingType::Level,
        RankingType::Fame,
        RankingType::Currency,
        RankingType::Aux1,
        RankingType::Aux2,
    ];

    /// Map a client-supplied value onto a ranking type.
    ///
    /// Matching is case-insensitive and accepts the game's column names as
    /// aliases. Anything unrecognised falls back to [`RankingType::Level`].
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fame" => Self::Fame,
            "currency" | "meso" | "mesos" => Self::Currency,
            "aux1" | "dog" | "dog_points" => Self::Aux1,
            "aux2" | "fish" | "fish_points" => Self::Aux2,
            _ => Self::Level,
        }
    }

    /// Canonical label, as echoed back in responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Level => "level",
            Self::Fame => "fame",
            Self::Currency => "currency",
            Self::Aux1 => "aux1",
            Self::Aux2 => "aux2",
        }
    }
}

impl std::fmt::Display for RankingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LeaderboardQuery
// ---------------------------------------------------------------------------

/// A fully normalised leaderboard request. Also serves as the read-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaderboardQuery {
    pub ranking: RankingType,
    /// Case-insensitive substring filter on character name.
    pub name_filter: Option<String>,
    /// Always within `1..=MAX_LIMIT`.
    pub limit: i64,
}

impl LeaderboardQuery {
    /// Build a query from raw request values.
    pub fn from_raw(
        ranking: Option<&str>,
        name_filter: Option<&str>,
        limit: Option<&str>,
        default_limit: i64,
        max_limit: i64,
    ) -> Self {
        Self {
            ranking: ranking.map(RankingType::parse_lenient).unwrap_or_default(),
            name_filter: normalize_filter(name_filter),
            limit: parse_limit(limit, default_limit, max_limit),
        }
    }
}

/// Parse a client-supplied limit.
///
/// Non-numeric, zero or negative input yields `default`; fractional input is
/// floored; anything above `max` is clamped to `max`. The result is never
/// below 1 nor above [`MAX_LIMIT`].
pub fn parse_limit(raw: Option<&str>, default: i64, max: i64) -> i64 {
    let max = max.clamp(1, MAX_LIMIT);
    let default = default.clamp(1, max);

    let Some(value) = raw.and_then(|r| r.trim().parse::<f64>().ok()) else {
        return default;
    };
    if !value.is_finite() {
        return default;
    }

    let floored = value.floor();
    if floored < 1.0 {
        return default;
    }
    if floored >= max as f64 {
        return max;
    }
    floored as i64
}

/// Trim a name filter, dropping it when blank and capping its length.
pub fn normalize_filter(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_FILTER_CHARS).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
