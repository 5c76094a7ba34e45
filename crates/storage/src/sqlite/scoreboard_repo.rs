use lms_core::model::{ScoreboardEntry, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{id_i64, ser, u64_from_i64, user_id_from_i64};
use crate::repository::{LeaderboardRow, ScoreboardRepository, StorageError};

#[async_trait::async_trait]
impl ScoreboardRepository for SqliteRepository {
    async fn get_entry(&self, user_id: UserId) -> Result<Option<ScoreboardEntry>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, score FROM scoreboards
            WHERE user_id = ?1
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|row| {
            let user_id = user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?;
            let score = u64_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
            Ok(ScoreboardEntry::from_persisted(user_id, score))
        })
        .transpose()
    }

    async fn get_or_create(&self, user_id: UserId) -> Result<ScoreboardEntry, StorageError> {
        // DO NOTHING would return no row on conflict; the no-op update keeps
        // RETURNING populated either way.
        let row = sqlx::query(
            r"
            INSERT INTO scoreboards (user_id, score)
            VALUES (?1, 0)
            ON CONFLICT(user_id) DO UPDATE SET
                score = score
            RETURNING user_id, score
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let user_id = user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?;
        let score = u64_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
        Ok(ScoreboardEntry::from_persisted(user_id, score))
    }

    async fn add_score(
        &self,
        user_id: UserId,
        points: u64,
    ) -> Result<ScoreboardEntry, StorageError> {
        let points = i64::try_from(points)
            .map_err(|_| StorageError::Serialization("award points overflow".into()))?;

        let row = sqlx::query(
            r"
            INSERT INTO scoreboards (user_id, score)
            VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET
                score = score + excluded.score
            RETURNING user_id, score
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(points)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let user_id = user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?;
        let score = u64_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
        Ok(ScoreboardEntry::from_persisted(user_id, score))
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT s.user_id, u.first_name, u.last_name, u.email, s.score
            FROM scoreboards s
            JOIN users u ON u.id = s.user_id
            ORDER BY s.score DESC, u.first_name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(LeaderboardRow {
                user_id: user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
                first_name: row.try_get::<String, _>("first_name").map_err(ser)?,
                last_name: row.try_get::<String, _>("last_name").map_err(ser)?,
                email: row.try_get::<String, _>("email").map_err(ser)?,
                score: u64_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
            });
        }
        Ok(out)
    }
}
