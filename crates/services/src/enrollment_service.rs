use std::sync::Arc;

use tracing::info;

use lms_core::model::{CourseId, CourseProgress, UserId};
use lms_core::time::Clock;
use storage::repository::{CourseCatalogRepository, ProgressRepository, StorageError};

use crate::error::EnrollmentError;

/// Creates progress rows: enrolling a user snapshots the course structure
/// (section and module counts) into a fresh `CourseProgress` aggregate.
pub struct EnrollmentService {
    clock: Clock,
    catalog: Arc<dyn CourseCatalogRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CourseCatalogRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            progress,
        }
    }

    /// Enroll a user into a course.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::CourseNotFound` / `UserNotFound` if either
    /// side does not resolve, `CourseInactive` for unpublished courses, and
    /// `AlreadyEnrolled` if a progress row for the pair already exists.
    pub async fn enroll(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, EnrollmentError> {
        let course = self
            .catalog
            .get_course(course_id)
            .await?
            .ok_or(EnrollmentError::CourseNotFound)?;
        if !course.is_active() {
            return Err(EnrollmentError::CourseInactive);
        }

        let user = self
            .catalog
            .get_user(user_id)
            .await?
            .ok_or(EnrollmentError::UserNotFound)?;

        let total_sections = self.catalog.section_count_of_course(course_id).await?;
        let module_ids = self.catalog.module_ids_of_course(course_id).await?;
        let total_modules = u32::try_from(module_ids.len())
            .map_err(|_| StorageError::Serialization("module count overflow".into()))?;

        let progress = CourseProgress::new_enrollment(
            user.id(),
            course.id(),
            total_sections,
            total_modules,
            self.clock.now(),
        );

        match self.progress.insert_enrollment(&progress).await {
            Ok(()) => {
                info!(
                    user = %user_id,
                    course = %course_id,
                    total_sections,
                    total_modules,
                    "user enrolled"
                );
                Ok(progress)
            }
            Err(StorageError::Conflict) => Err(EnrollmentError::AlreadyEnrolled),
            Err(e) => Err(e.into()),
        }
    }
}
