pub mod leaderboard;
pub mod status;
