use crate::model::ids::UserId;

/// Cumulative points for one user on the global leaderboard.
///
/// Created lazily with a zero score on the first award, then only ever
/// incremented. Nothing in the progress subsystem resets or deletes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreboardEntry {
    user_id: UserId,
    score: u64,
}

impl ScoreboardEntry {
    /// Creates a fresh entry with a zero score.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, score: 0 }
    }

    /// Rehydrates an entry from storage.
    #[must_use]
    pub fn from_persisted(user_id: UserId, score: u64) -> Self {
        Self { user_id, score }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Adds award points to the running score.
    pub fn add_points(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }
}

/// Points granted for completing a course, keyed by the course's module
/// count at enrollment time. The schedule is fixed, not configurable.
#[must_use]
pub fn reward_points(total_modules: u32) -> u64 {
    match total_modules {
        0 => 0,
        1 => 100,
        2 => 111,
        3 | 4 => 123,
        5 => 155,
        _ => 199,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_schedule_matches_module_counts() {
        assert_eq!(reward_points(0), 0);
        assert_eq!(reward_points(1), 100);
        assert_eq!(reward_points(2), 111);
        assert_eq!(reward_points(3), 123);
        assert_eq!(reward_points(4), 123);
        assert_eq!(reward_points(5), 155);
        assert_eq!(reward_points(6), 199);
        assert_eq!(reward_points(40), 199);
    }

    #[test]
    fn entry_accumulates_points() {
        let mut entry = ScoreboardEntry::new(UserId::new(3));
        assert_eq!(entry.score(), 0);
        entry.add_points(100);
        entry.add_points(123);
        assert_eq!(entry.score(), 223);
    }
}
