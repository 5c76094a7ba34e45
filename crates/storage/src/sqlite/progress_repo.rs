use lms_core::model::{CourseId, CourseProgress, SectionCompletion, SectionId, UserId};

use super::SqliteRepository;
use super::mapping::{id_i64, ids_to_json, map_progress_row};
use crate::repository::{CourseProgressRecord, ProgressRepository, StorageError};

/// Maps a sqlx error, turning unique-constraint violations into `Conflict`
/// so callers can tell "row already there" apart from real failures.
fn db_err(e: sqlx::Error) -> StorageError {
    if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

/// Binds every column of the progress row update, shared by both apply paths.
fn progress_binds(record: &CourseProgressRecord) -> Result<ProgressUpdateBinds, StorageError> {
    Ok(ProgressUpdateBinds {
        completed_sections: i64::from(record.completed_sections),
        pending_sections: i64::from(record.pending_sections),
        completed_modules: i64::from(record.completed_modules),
        pending_modules: i64::from(record.pending_modules),
        completed_section_ids: ids_to_json(&record.completed_section_ids)?,
        completed_module_ids: ids_to_json(&record.completed_module_ids)?,
        awarded: i64::from(record.awarded),
        user_id: id_i64("user_id", record.user_id.value())?,
        course_id: id_i64("course_id", record.course_id.value())?,
    })
}

struct ProgressUpdateBinds {
    completed_sections: i64,
    pending_sections: i64,
    completed_modules: i64,
    pending_modules: i64,
    completed_section_ids: String,
    completed_module_ids: String,
    awarded: i64,
    user_id: i64,
    course_id: i64,
}

const UPDATE_PROGRESS_SQL: &str = r"
    UPDATE user_course_progress SET
        completed_sections = ?1,
        pending_sections = ?2,
        completed_modules = ?3,
        pending_modules = ?4,
        completed_section_ids = ?5,
        completed_module_ids = ?6,
        awarded = ?7
    WHERE user_id = ?8 AND course_id = ?9
";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn insert_enrollment(&self, progress: &CourseProgress) -> Result<(), StorageError> {
        let record = CourseProgressRecord::from_progress(progress);

        sqlx::query(
            r"
            INSERT INTO user_course_progress (
                user_id, course_id, completed_sections, pending_sections,
                completed_modules, pending_modules, completed_section_ids,
                completed_module_ids, awarded, started_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(id_i64("user_id", record.user_id.value())?)
        .bind(id_i64("course_id", record.course_id.value())?)
        .bind(i64::from(record.completed_sections))
        .bind(i64::from(record.pending_sections))
        .bind(i64::from(record.completed_modules))
        .bind(i64::from(record.pending_modules))
        .bind(ids_to_json(&record.completed_section_ids)?)
        .bind(ids_to_json(&record.completed_module_ids)?)
        .bind(i64::from(record.awarded))
        .bind(record.started_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                user_id, course_id, completed_sections, pending_sections,
                completed_modules, pending_modules, completed_section_ids,
                completed_module_ids, awarded, started_at
            FROM user_course_progress
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref()
            .map(map_progress_row)
            .transpose()?
            .map(|record| {
                record
                    .into_progress()
                    .map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .transpose()
    }

    async fn list_progress(
        &self,
        user_id: Option<UserId>,
        course_id: Option<CourseId>,
    ) -> Result<Vec<CourseProgress>, StorageError> {
        let mut sql = String::from(
            r"
            SELECT
                user_id, course_id, completed_sections, pending_sections,
                completed_modules, pending_modules, completed_section_ids,
                completed_module_ids, awarded, started_at
            FROM user_course_progress
            WHERE 1 = 1
            ",
        );
        if user_id.is_some() {
            sql.push_str(" AND user_id = ?1");
        }
        if course_id.is_some() {
            sql.push_str(if user_id.is_some() {
                " AND course_id = ?2"
            } else {
                " AND course_id = ?1"
            });
        }
        sql.push_str(" ORDER BY user_id ASC, course_id ASC");

        let mut q = sqlx::query(&sql);
        if let Some(user) = user_id {
            q = q.bind(id_i64("user_id", user.value())?);
        }
        if let Some(course) = course_id {
            q = q.bind(id_i64("course_id", course.value())?);
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(
                map_progress_row(row)?
                    .into_progress()
                    .map_err(|e| StorageError::Serialization(e.to_string()))?,
            );
        }
        Ok(out)
    }

    async fn section_completion_exists(
        &self,
        user_id: UserId,
        section_id: SectionId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query(
            r"
            SELECT 1 FROM user_section_progress
            WHERE user_id = ?1 AND course_section_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("section_id", section_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(row.is_some())
    }

    async fn apply_section_done(
        &self,
        progress: &CourseProgress,
        completion: &SectionCompletion,
        award: Option<u64>,
    ) -> Result<(), StorageError> {
        let record = CourseProgressRecord::from_progress(progress);
        let binds = progress_binds(&record)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // The unique (user_id, course_section_id) key serializes concurrent
        // completions of the same section; a second writer gets Conflict.
        sqlx::query(
            r"
            INSERT INTO user_section_progress (user_id, course_section_id, completed_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(id_i64("user_id", completion.user_id().value())?)
        .bind(id_i64("section_id", completion.section_id().value())?)
        .bind(completion.completed_at())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let updated = sqlx::query(UPDATE_PROGRESS_SQL)
            .bind(binds.completed_sections)
            .bind(binds.pending_sections)
            .bind(binds.completed_modules)
            .bind(binds.pending_modules)
            .bind(binds.completed_section_ids)
            .bind(binds.completed_module_ids)
            .bind(binds.awarded)
            .bind(binds.user_id)
            .bind(binds.course_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        if let Some(points) = award {
            let points = i64::try_from(points)
                .map_err(|_| StorageError::Serialization("award points overflow".into()))?;
            sqlx::query(
                r"
                INSERT INTO scoreboards (user_id, score)
                VALUES (?1, ?2)
                ON CONFLICT(user_id) DO UPDATE SET
                    score = score + excluded.score
                ",
            )
            .bind(id_i64("user_id", progress.user_id().value())?)
            .bind(points)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn apply_section_undone(
        &self,
        progress: &CourseProgress,
        user_id: UserId,
        section_id: SectionId,
    ) -> Result<(), StorageError> {
        let record = CourseProgressRecord::from_progress(progress);
        let binds = progress_binds(&record)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // No error when the marker is absent; the delete is simply a no-op.
        sqlx::query(
            r"
            DELETE FROM user_section_progress
            WHERE user_id = ?1 AND course_section_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("section_id", section_id.value())?)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let updated = sqlx::query(UPDATE_PROGRESS_SQL)
            .bind(binds.completed_sections)
            .bind(binds.pending_sections)
            .bind(binds.completed_modules)
            .bind(binds.pending_modules)
            .bind(binds.completed_section_ids)
            .bind(binds.completed_module_ids)
            .bind(binds.awarded)
            .bind(binds.user_id)
            .bind(binds.course_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
