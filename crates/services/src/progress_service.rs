use std::sync::Arc;

use tracing::{debug, info};

use lms_core::model::{
    CourseProgress, SectionCompletion, SectionId, UserId, reward_points,
};
use lms_core::time::Clock;
use storage::repository::{CourseCatalogRepository, ProgressRepository, StorageError};

use crate::error::ProgressServiceError;

//
// ─── PROGRESS UPDATE ───────────────────────────────────────────────────────────
//

/// Result of a mark-done/mark-undone call: the aggregate as persisted, and
/// the points credited to the scoreboard when this call completed the course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub progress: CourseProgress,
    pub awarded_points: Option<u64>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// The progress update engine: the sole writer of per-(user, course)
/// progress state.
///
/// Both operations load the aggregate, mutate a working copy, and hand the
/// final state to the repository's atomic apply, so every row involved
/// commits together or not at all.
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<dyn CourseCatalogRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
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

    /// Mark a section as completed for a user.
    ///
    /// On success the section joins the completed set, the owning module is
    /// completed if all of its sections now are, and once nothing in the
    /// course remains pending the award latch is set and reward points are
    /// credited to the user's scoreboard row, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` if the section or its module
    /// does not resolve, `NotEnrolled` if the user has no progress row for
    /// the owning course, `AlreadyCompleted` if the section already has a
    /// completion marker (also under a concurrent-insert race), and
    /// `EmptySection` if the section owns no materials. Storage failures
    /// propagate; on any error no state changes.
    pub async fn mark_section_done(
        &self,
        user_id: UserId,
        section_id: SectionId,
    ) -> Result<ProgressUpdate, ProgressServiceError> {
        let section = self
            .catalog
            .get_section(section_id)
            .await?
            .ok_or(ProgressServiceError::NotFound)?;
        let module = self
            .catalog
            .get_module(section.module_id())
            .await?
            .ok_or(ProgressServiceError::NotFound)?;

        let mut progress = self
            .progress
            .get_progress(user_id, module.course_id())
            .await?
            .ok_or(ProgressServiceError::NotEnrolled)?;

        if self
            .progress
            .section_completion_exists(user_id, section_id)
            .await?
        {
            return Err(ProgressServiceError::AlreadyCompleted);
        }

        if self.catalog.material_count_of_section(section_id).await? == 0 {
            return Err(ProgressServiceError::EmptySection);
        }

        progress.record_section(section_id);

        // Module completion: every section of the owning module must be in
        // the completed set.
        let module_sections = self.catalog.section_ids_of_module(module.id()).await?;
        let all_sections_done = !module_sections.is_empty()
            && module_sections.iter().all(|id| progress.has_section(*id));
        if all_sections_done && !progress.has_module(module.id()) {
            progress.record_module(module.id());
            debug!(
                module = %module.id(),
                course = %module.course_id(),
                "module completed"
            );
        }

        // Course completion: the award latch fires at most once per
        // enrollment, and un-completing sections later never reverses it.
        let mut awarded_points = None;
        if progress.is_complete() && progress.mark_awarded() {
            let points = reward_points(progress.total_modules());
            awarded_points = Some(points);
            info!(
                user = %user_id,
                course = %progress.course_id(),
                points,
                "course completed, awarding points"
            );
        }

        let completion = SectionCompletion::new(user_id, section_id, self.clock.now());
        match self
            .progress
            .apply_section_done(&progress, &completion, awarded_points)
            .await
        {
            Ok(()) => Ok(ProgressUpdate {
                progress,
                awarded_points,
            }),
            // A concurrent call inserted the completion marker first; report
            // it the same way as the precondition check.
            Err(StorageError::Conflict) => Err(ProgressServiceError::AlreadyCompleted),
            Err(e) => Err(e.into()),
        }
    }

    /// Mark a section as not completed for a user.
    ///
    /// Deleting the completion marker is a no-op if the section was never
    /// marked done; the call still succeeds. The award latch and the
    /// scoreboard score are never reversed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` if the section or its module
    /// does not resolve, `NotEnrolled` if the user has no progress row for
    /// the owning course. Storage failures propagate; on any error no state
    /// changes.
    pub async fn mark_section_undone(
        &self,
        user_id: UserId,
        section_id: SectionId,
    ) -> Result<ProgressUpdate, ProgressServiceError> {
        let section = self
            .catalog
            .get_section(section_id)
            .await?
            .ok_or(ProgressServiceError::NotFound)?;
        let module = self
            .catalog
            .get_module(section.module_id())
            .await?
            .ok_or(ProgressServiceError::NotFound)?;

        let mut progress = self
            .progress
            .get_progress(user_id, module.course_id())
            .await?
            .ok_or(ProgressServiceError::NotEnrolled)?;

        progress.clear_section(section_id);

        // Module membership is re-derived from the updated section set, not
        // from whether this particular call removed anything.
        if progress.has_module(module.id()) {
            let module_sections = self.catalog.section_ids_of_module(module.id()).await?;
            let still_all_done = !module_sections.is_empty()
                && module_sections.iter().all(|id| progress.has_section(*id));
            if !still_all_done {
                progress.clear_module(module.id());
            }
        }

        self.progress
            .apply_section_undone(&progress, user_id, section_id)
            .await?;

        debug!(
            user = %user_id,
            section = %section_id,
            "section marked undone"
        );

        Ok(ProgressUpdate {
            progress,
            awarded_points: None,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::model::{
        Course, CourseId, CourseMaterial, CourseModule, CourseSection, CourseStatus, MaterialId,
        MaterialKind, ModuleId,
    };
    use lms_core::time::{fixed_clock, fixed_now};
    use storage::repository::{
        CourseCatalogRepository, InMemoryRepository, ProgressRepository, ScoreboardRepository,
    };

    /// Seeds a course with `modules` modules, each owning `sections_per`
    /// sections, each owning one material. Section ids are assigned
    /// sequentially from 1, module-major.
    async fn seed_course(repo: &InMemoryRepository, modules: u64, sections_per: u64) {
        let course = Course::new(
            CourseId::new(1),
            "Rust Basics",
            None,
            CourseStatus::Active,
            None,
            fixed_now(),
        )
        .unwrap();
        repo.upsert_course(&course).await.unwrap();

        let mut section_id = 1_u64;
        for m in 1..=modules {
            let module =
                CourseModule::new(ModuleId::new(m), course.id(), format!("Module {m}"), None)
                    .unwrap();
            repo.upsert_module(&module).await.unwrap();

            for _ in 0..sections_per {
                let section = CourseSection::new(
                    SectionId::new(section_id),
                    module.id(),
                    format!("Section {section_id}"),
                    None,
                )
                .unwrap();
                repo.upsert_section(&section).await.unwrap();

                let material = CourseMaterial::new(
                    MaterialId::new(section_id),
                    section.id(),
                    format!("Material {section_id}"),
                    MaterialKind::Text,
                    Some("body".into()),
                    None,
                    0,
                )
                .unwrap();
                repo.upsert_material(&material).await.unwrap();

                section_id += 1;
            }
        }
    }

    async fn enroll(repo: &InMemoryRepository, user: u64, total_sections: u32, total_modules: u32) {
        let progress = CourseProgress::new_enrollment(
            UserId::new(user),
            CourseId::new(1),
            total_sections,
            total_modules,
            fixed_now(),
        );
        repo.insert_enrollment(&progress).await.unwrap();
    }

    fn service(repo: &InMemoryRepository) -> ProgressService {
        ProgressService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn mark_done_requires_enrollment() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 1, 2).await;

        let err = service(&repo)
            .mark_section_done(UserId::new(1), SectionId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::NotEnrolled));
    }

    #[tokio::test]
    async fn mark_done_rejects_unknown_section() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 1, 2).await;
        enroll(&repo, 1, 2, 1).await;

        let err = service(&repo)
            .mark_section_done(UserId::new(1), SectionId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::NotFound));
    }

    #[tokio::test]
    async fn mark_done_rejects_empty_section() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 1, 2).await;
        // A third section with no material.
        let section =
            CourseSection::new(SectionId::new(3), ModuleId::new(1), "Empty", None).unwrap();
        repo.upsert_section(&section).await.unwrap();
        enroll(&repo, 1, 3, 1).await;

        let err = service(&repo)
            .mark_section_done(UserId::new(1), SectionId::new(3))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::EmptySection));

        // Counters untouched.
        let progress = repo
            .get_progress(UserId::new(1), CourseId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.completed_sections(), 0);
        assert_eq!(progress.pending_sections(), 3);
    }

    #[tokio::test]
    async fn mark_done_twice_reports_already_completed() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 1, 2).await;
        enroll(&repo, 1, 2, 1).await;
        let service = service(&repo);

        service
            .mark_section_done(UserId::new(1), SectionId::new(1))
            .await
            .unwrap();
        let err = service
            .mark_section_done(UserId::new(1), SectionId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::AlreadyCompleted));

        // No double counting.
        let progress = repo
            .get_progress(UserId::new(1), CourseId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.completed_sections(), 1);
    }

    #[tokio::test]
    async fn completing_course_awards_points_once() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 1, 2).await;
        enroll(&repo, 1, 2, 1).await;
        let service = service(&repo);

        let first = service
            .mark_section_done(UserId::new(1), SectionId::new(1))
            .await
            .unwrap();
        assert_eq!(first.awarded_points, None);
        assert!(!first.progress.awarded());

        let second = service
            .mark_section_done(UserId::new(1), SectionId::new(2))
            .await
            .unwrap();
        assert_eq!(second.awarded_points, Some(100));
        assert!(second.progress.awarded());
        assert_eq!(second.progress.completed_sections(), 2);
        assert_eq!(second.progress.pending_sections(), 0);
        assert_eq!(second.progress.completed_modules(), 1);
        assert_eq!(second.progress.pending_modules(), 0);

        let entry = repo.get_entry(UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(entry.score(), 100);
    }

    #[tokio::test]
    async fn three_module_course_awards_123_points() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 3, 1).await;
        enroll(&repo, 1, 3, 3).await;
        let service = service(&repo);

        let mut last = None;
        for id in 1..=3_u64 {
            last = Some(
                service
                    .mark_section_done(UserId::new(1), SectionId::new(id))
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(last.unwrap().awarded_points, Some(123));
        let entry = repo.get_entry(UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(entry.score(), 123);
    }

    #[tokio::test]
    async fn module_completion_is_order_independent() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 1, 2).await;
        enroll(&repo, 1, 2, 1).await;
        enroll(&repo, 2, 2, 1).await;
        let service = service(&repo);

        // User 1 completes in order 1, 2; user 2 in order 2, 1.
        for (user, order) in [(1_u64, [1_u64, 2]), (2, [2, 1])] {
            for id in order {
                service
                    .mark_section_done(UserId::new(user), SectionId::new(id))
                    .await
                    .unwrap();
            }
            let progress = repo
                .get_progress(UserId::new(user), CourseId::new(1))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(progress.completed_modules(), 1);
            assert!(progress.has_module(ModuleId::new(1)));
        }
    }

    #[tokio::test]
    async fn partial_module_stays_pending() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 2, 2).await;
        enroll(&repo, 1, 4, 2).await;
        let service = service(&repo);

        let update = service
            .mark_section_done(UserId::new(1), SectionId::new(1))
            .await
            .unwrap();
        assert_eq!(update.progress.completed_modules(), 0);
        assert_eq!(update.progress.pending_modules(), 2);
        assert_eq!(update.awarded_points, None);
    }

    #[tokio::test]
    async fn undone_never_done_is_a_successful_noop() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 1, 2).await;
        enroll(&repo, 1, 2, 1).await;

        let update = service(&repo)
            .mark_section_undone(UserId::new(1), SectionId::new(1))
            .await
            .unwrap();
        assert_eq!(update.progress.completed_sections(), 0);
        assert_eq!(update.progress.pending_sections(), 2);
    }

    #[tokio::test]
    async fn undone_requires_enrollment() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 1, 2).await;

        let err = service(&repo)
            .mark_section_undone(UserId::new(1), SectionId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::NotEnrolled));
    }

    #[tokio::test]
    async fn undone_reopens_module_and_section() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 2, 2).await;
        enroll(&repo, 1, 4, 2).await;
        let service = service(&repo);

        service
            .mark_section_done(UserId::new(1), SectionId::new(1))
            .await
            .unwrap();
        service
            .mark_section_done(UserId::new(1), SectionId::new(2))
            .await
            .unwrap();

        let update = service
            .mark_section_undone(UserId::new(1), SectionId::new(2))
            .await
            .unwrap();
        assert_eq!(update.progress.completed_sections(), 1);
        assert_eq!(update.progress.pending_sections(), 3);
        assert_eq!(update.progress.completed_modules(), 0);
        assert_eq!(update.progress.pending_modules(), 2);
        assert!(!repo
            .section_completion_exists(UserId::new(1), SectionId::new(2))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn undone_after_award_keeps_points_and_latch() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 1, 2).await;
        enroll(&repo, 1, 2, 1).await;
        let service = service(&repo);

        for id in [1_u64, 2] {
            service
                .mark_section_done(UserId::new(1), SectionId::new(id))
                .await
                .unwrap();
        }

        let update = service
            .mark_section_undone(UserId::new(1), SectionId::new(1))
            .await
            .unwrap();
        assert!(update.progress.awarded());
        assert_eq!(update.progress.pending_sections(), 1);

        // Score unchanged.
        let entry = repo.get_entry(UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(entry.score(), 100);

        // Re-completing the section does not award again.
        let redo = service
            .mark_section_done(UserId::new(1), SectionId::new(1))
            .await
            .unwrap();
        assert_eq!(redo.awarded_points, None);
        let entry = repo.get_entry(UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(entry.score(), 100);
    }

    #[tokio::test]
    async fn counters_stay_invariant_across_done_undone_sequences() {
        let repo = InMemoryRepository::new();
        seed_course(&repo, 2, 2).await;
        enroll(&repo, 1, 4, 2).await;
        let service = service(&repo);

        let total = 4_u32;
        let user = UserId::new(1);
        let steps: [(bool, u64); 6] = [
            (true, 1),
            (true, 2),
            (false, 1),
            (true, 3),
            (true, 1),
            (false, 3),
        ];
        for (done, id) in steps {
            let update = if done {
                service.mark_section_done(user, SectionId::new(id)).await
            } else {
                service.mark_section_undone(user, SectionId::new(id)).await
            }
            .unwrap();
            assert_eq!(
                update.progress.completed_sections() + update.progress.pending_sections(),
                total
            );
        }
    }
}
