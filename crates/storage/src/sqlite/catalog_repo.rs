use lms_core::model::{
    Course, CourseId, CourseMaterial, CourseModule, CourseSection, ModuleId, SectionId, User,
    UserId,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    id_i64, map_course_row, map_module_row, map_section_row, map_user_row, module_id_from_i64,
    section_id_from_i64, ser, u32_from_i64,
};
use crate::repository::{CourseCatalogRepository, StorageError};

#[async_trait::async_trait]
impl CourseCatalogRepository for SqliteRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (id, first_name, last_name, email, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                -- keep created_at from the original insert; only update mutable fields
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                email = excluded.email
            ",
        )
        .bind(id_i64("user_id", user.id().value())?)
        .bind(user.first_name().to_owned())
        .bind(user.last_name().to_owned())
        .bind(user.email().to_owned())
        .bind(user.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, first_name, last_name, email, created_at
            FROM users WHERE id = ?1
            ",
        )
        .bind(id_i64("user_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, description, status, intro_video_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                status = excluded.status,
                intro_video_url = excluded.intro_video_url
            ",
        )
        .bind(id_i64("course_id", course.id().value())?)
        .bind(course.title().to_owned())
        .bind(course.description().map(ToOwned::to_owned))
        .bind(course.status().as_i64())
        .bind(course.intro_video_url().map(|u| u.as_str().to_owned()))
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, status, intro_video_url, created_at
            FROM courses WHERE id = ?1
            ",
        )
        .bind(id_i64("course_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn upsert_module(&self, module: &CourseModule) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO course_modules (id, course_id, title, description)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                description = excluded.description
            ",
        )
        .bind(id_i64("module_id", module.id().value())?)
        .bind(id_i64("course_id", module.course_id().value())?)
        .bind(module.title().to_owned())
        .bind(module.description().map(ToOwned::to_owned))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<CourseModule>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, course_id, title, description
            FROM course_modules WHERE id = ?1
            ",
        )
        .bind(id_i64("module_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_module_row).transpose()
    }

    async fn upsert_section(&self, section: &CourseSection) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO course_sections (id, module_id, title, description)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                module_id = excluded.module_id,
                title = excluded.title,
                description = excluded.description
            ",
        )
        .bind(id_i64("section_id", section.id().value())?)
        .bind(id_i64("module_id", section.module_id().value())?)
        .bind(section.title().to_owned())
        .bind(section.description().map(ToOwned::to_owned))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_section(&self, id: SectionId) -> Result<Option<CourseSection>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, module_id, title, description
            FROM course_sections WHERE id = ?1
            ",
        )
        .bind(id_i64("section_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_section_row).transpose()
    }

    async fn upsert_material(&self, material: &CourseMaterial) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO course_materials (id, section_id, title, kind, content, url, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                section_id = excluded.section_id,
                title = excluded.title,
                kind = excluded.kind,
                content = excluded.content,
                url = excluded.url,
                sort_order = excluded.sort_order
            ",
        )
        .bind(id_i64("material_id", material.id().value())?)
        .bind(id_i64("section_id", material.section_id().value())?)
        .bind(material.title().to_owned())
        .bind(material.kind().as_str())
        .bind(material.content().map(ToOwned::to_owned))
        .bind(material.url().map(|u| u.as_str().to_owned()))
        .bind(i64::from(material.sort_order()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn section_ids_of_module(
        &self,
        module_id: ModuleId,
    ) -> Result<Vec<SectionId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id FROM course_sections
            WHERE module_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("module_id", module_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(section_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?);
        }
        Ok(ids)
    }

    async fn module_ids_of_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ModuleId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id FROM course_modules
            WHERE course_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(module_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?);
        }
        Ok(ids)
    }

    async fn material_count_of_section(
        &self,
        section_id: SectionId,
    ) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS n FROM course_materials
            WHERE section_id = ?1
            ",
        )
        .bind(id_i64("section_id", section_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        u32_from_i64("material count", row.try_get::<i64, _>("n").map_err(ser)?)
    }

    async fn section_count_of_course(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS n
            FROM course_sections s
            JOIN course_modules m ON m.id = s.module_id
            WHERE m.course_id = ?1
            ",
        )
        .bind(id_i64("course_id", course_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        u32_from_i64("section count", row.try_get::<i64, _>("n").map_err(ser)?)
    }
}
