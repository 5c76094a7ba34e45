use lms_core::model::{
    Course, CourseModule, CourseSection, CourseStatus, ModuleId, SectionId, User,
};
use sqlx::Row;

use crate::repository::{CourseProgressRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<lms_core::model::UserId, StorageError> {
    Ok(lms_core::model::UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<lms_core::model::CourseId, StorageError> {
    Ok(lms_core::model::CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn module_id_from_i64(v: i64) -> Result<ModuleId, StorageError> {
    Ok(ModuleId::new(i64_to_u64("module_id", v)?))
}

pub(crate) fn section_id_from_i64(v: i64) -> Result<SectionId, StorageError> {
    Ok(SectionId::new(i64_to_u64("section_id", v)?))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Encodes an id collection as the JSON array stored in the progress row.
///
/// The identifier newtypes serialize as their underlying integers, so the
/// stored form is a plain `[1,2,3]` array.
pub(crate) fn ids_to_json<T: serde::Serialize>(ids: &[T]) -> Result<String, StorageError> {
    serde_json::to_string(ids).map_err(ser)
}

pub(crate) fn section_ids_from_json(raw: &str) -> Result<Vec<SectionId>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn module_ids_from_json(raw: &str) -> Result<Vec<ModuleId>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, StorageError> {
    User::new(
        user_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("first_name").map_err(ser)?,
        row.try_get::<String, _>("last_name").map_err(ser)?,
        row.try_get::<String, _>("email").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_course_row(row: &sqlx::sqlite::SqliteRow) -> Result<Course, StorageError> {
    let status =
        CourseStatus::from_i64(row.try_get::<i64, _>("status").map_err(ser)?).map_err(ser)?;
    let intro_video_url: Option<String> = row.try_get("intro_video_url").map_err(ser)?;

    Course::new(
        course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        status,
        intro_video_url.as_deref(),
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_module_row(row: &sqlx::sqlite::SqliteRow) -> Result<CourseModule, StorageError> {
    CourseModule::new(
        module_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_section_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<CourseSection, StorageError> {
    CourseSection::new(
        section_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        module_id_from_i64(row.try_get::<i64, _>("module_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<CourseProgressRecord, StorageError> {
    let section_ids_raw: String = row.try_get("completed_section_ids").map_err(ser)?;
    let module_ids_raw: String = row.try_get("completed_module_ids").map_err(ser)?;

    Ok(CourseProgressRecord {
        user_id: user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        course_id: course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        completed_sections: u32_from_i64(
            "completed_sections",
            row.try_get::<i64, _>("completed_sections").map_err(ser)?,
        )?,
        pending_sections: u32_from_i64(
            "pending_sections",
            row.try_get::<i64, _>("pending_sections").map_err(ser)?,
        )?,
        completed_modules: u32_from_i64(
            "completed_modules",
            row.try_get::<i64, _>("completed_modules").map_err(ser)?,
        )?,
        pending_modules: u32_from_i64(
            "pending_modules",
            row.try_get::<i64, _>("pending_modules").map_err(ser)?,
        )?,
        completed_section_ids: section_ids_from_json(&section_ids_raw)?,
        completed_module_ids: module_ids_from_json(&module_ids_raw)?,
        awarded: row.try_get::<i64, _>("awarded").map_err(ser)? != 0,
        started_at: row.try_get("started_at").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_sets_roundtrip_as_plain_json_arrays() {
        let ids = vec![SectionId::new(3), SectionId::new(1), SectionId::new(7)];
        let json = ids_to_json(&ids).unwrap();
        assert_eq!(json, "[3,1,7]");
        assert_eq!(section_ids_from_json(&json).unwrap(), ids);
    }

    #[test]
    fn empty_id_set_is_empty_array() {
        let json = ids_to_json::<ModuleId>(&[]).unwrap();
        assert_eq!(json, "[]");
        assert!(module_ids_from_json(&json).unwrap().is_empty());
    }

    #[test]
    fn malformed_id_json_is_a_serialization_error() {
        let err = section_ids_from_json("not json").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
