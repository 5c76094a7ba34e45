use std::sync::Arc;

use lms_core::model::UserId;
use storage::repository::{LeaderboardRow, ScoreboardRepository};

use crate::error::ScoreboardServiceError;

/// Read side of the gamified scoreboard. Points are only ever written by
/// the progress engine's award path.
pub struct ScoreboardService {
    scoreboard: Arc<dyn ScoreboardRepository>,
}

impl ScoreboardService {
    #[must_use]
    pub fn new(scoreboard: Arc<dyn ScoreboardRepository>) -> Self {
        Self { scoreboard }
    }

    /// A user's current score; zero when they have never been awarded.
    ///
    /// # Errors
    ///
    /// Returns `ScoreboardServiceError::Storage` if repository access fails.
    pub async fn score_for(&self, user_id: UserId) -> Result<u64, ScoreboardServiceError> {
        let entry = self.scoreboard.get_entry(user_id).await?;
        Ok(entry.map_or(0, |e| e.score()))
    }

    /// The full leaderboard, best score first, ties broken by first name.
    ///
    /// # Errors
    ///
    /// Returns `ScoreboardServiceError::Storage` if repository access fails.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardRow>, ScoreboardServiceError> {
        Ok(self.scoreboard.leaderboard().await?)
    }
}
