//! Query parameter types for API handlers.

use serde::Deserialize;

/// Leaderboard parameters (`?type=&limit=&q=`).
///
/// Everything is taken as raw strings so malformed values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardParams {
    #[serde(rename = "type")]
    pub ranking: Option<String>,
    pub limit: Option<String>,
    /// Name filter.
    pub q: Option<String>,
    /// Alias of `q`.
    pub name: Option<String>,
}

impl LeaderboardParams {
    /// The name filter, preferring `q` over `name`.
    pub fn name_filter(&self) -> Option<&str> {
        self.q
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .or(self.name.as_deref())
    }
}
