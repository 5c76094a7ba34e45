use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CourseId, ModuleId, SectionId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("completed sections counter ({counter}) does not match id set ({set})")]
    SectionCountMismatch { counter: u32, set: u32 },

    #[error("completed modules counter ({counter}) does not match id set ({set})")]
    ModuleCountMismatch { counter: u32, set: u32 },

    #[error("too many completed ids for a single course: {len}")]
    TooManyIds { len: usize },
}

//
// ─── COURSE PROGRESS ───────────────────────────────────────────────────────────
//

/// Per-(user, course) progress aggregate.
///
/// The completed-id sets are the single source of truth; section and module
/// counts are derived from them against the course structure snapshot taken
/// at enrollment time (`total_sections` / `total_modules`). Storage still
/// carries the denormalized counters, and rehydration cross-checks them
/// against the sets so drift is caught instead of silently clamped.
///
/// `awarded` is a one-way latch: once reward points have been granted for
/// this course it never returns to false, and un-completing sections never
/// revokes points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgress {
    user_id: UserId,
    course_id: CourseId,
    completed_section_ids: BTreeSet<SectionId>,
    completed_module_ids: BTreeSet<ModuleId>,
    total_sections: u32,
    total_modules: u32,
    awarded: bool,
    started_at: DateTime<Utc>,
}

impl CourseProgress {
    /// Creates the aggregate at enrollment time, with the course structure
    /// snapshot and nothing completed yet.
    #[must_use]
    pub fn new_enrollment(
        user_id: UserId,
        course_id: CourseId,
        total_sections: u32,
        total_modules: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            course_id,
            completed_section_ids: BTreeSet::new(),
            completed_module_ids: BTreeSet::new(),
            total_sections,
            total_modules,
            awarded: false,
            started_at,
        }
    }

    /// Rehydrates the aggregate from persisted storage, cross-checking the
    /// denormalized counters against the id sets.
    ///
    /// The snapshot totals are reconstructed as `completed + pending`.
    ///
    /// # Errors
    ///
    /// Returns a count-mismatch error if a stored counter disagrees with its
    /// id set, which would mean the two drifted apart in storage.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        course_id: CourseId,
        completed_section_ids: Vec<SectionId>,
        completed_module_ids: Vec<ModuleId>,
        completed_sections: u32,
        pending_sections: u32,
        completed_modules: u32,
        pending_modules: u32,
        awarded: bool,
        started_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        let section_ids: BTreeSet<SectionId> = completed_section_ids.iter().copied().collect();
        let module_ids: BTreeSet<ModuleId> = completed_module_ids.iter().copied().collect();

        let section_set = u32::try_from(section_ids.len()).map_err(|_| ProgressError::TooManyIds {
            len: section_ids.len(),
        })?;
        if section_set != completed_sections {
            return Err(ProgressError::SectionCountMismatch {
                counter: completed_sections,
                set: section_set,
            });
        }

        let module_set = u32::try_from(module_ids.len()).map_err(|_| ProgressError::TooManyIds {
            len: module_ids.len(),
        })?;
        if module_set != completed_modules {
            return Err(ProgressError::ModuleCountMismatch {
                counter: completed_modules,
                set: module_set,
            });
        }

        Ok(Self {
            user_id,
            course_id,
            completed_section_ids: section_ids,
            completed_module_ids: module_ids,
            total_sections: completed_sections + pending_sections,
            total_modules: completed_modules + pending_modules,
            awarded,
            started_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn completed_section_ids(&self) -> &BTreeSet<SectionId> {
        &self.completed_section_ids
    }

    #[must_use]
    pub fn completed_module_ids(&self) -> &BTreeSet<ModuleId> {
        &self.completed_module_ids
    }

    /// Derived: cardinality of the completed-section set.
    ///
    /// # Panics
    ///
    /// Panics if the set outgrows `u32`, which `record_section` prevents for
    /// any course structure a `u32` snapshot can describe.
    #[must_use]
    pub fn completed_sections(&self) -> u32 {
        u32::try_from(self.completed_section_ids.len()).expect("section set fits u32")
    }

    /// Derived: snapshot total minus completed, floored at zero.
    ///
    /// The floor matters only if the course structure shrank after
    /// enrollment and the set outgrew its snapshot.
    #[must_use]
    pub fn pending_sections(&self) -> u32 {
        self.total_sections.saturating_sub(self.completed_sections())
    }

    /// Derived: cardinality of the completed-module set.
    ///
    /// # Panics
    ///
    /// Panics if the set outgrows `u32`; see `completed_sections`.
    #[must_use]
    pub fn completed_modules(&self) -> u32 {
        u32::try_from(self.completed_module_ids.len()).expect("module set fits u32")
    }

    #[must_use]
    pub fn pending_modules(&self) -> u32 {
        self.total_modules.saturating_sub(self.completed_modules())
    }

    #[must_use]
    pub fn total_sections(&self) -> u32 {
        self.total_sections
    }

    #[must_use]
    pub fn total_modules(&self) -> u32 {
        self.total_modules
    }

    #[must_use]
    pub fn awarded(&self) -> bool {
        self.awarded
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn has_section(&self, section_id: SectionId) -> bool {
        self.completed_section_ids.contains(&section_id)
    }

    #[must_use]
    pub fn has_module(&self, module_id: ModuleId) -> bool {
        self.completed_module_ids.contains(&module_id)
    }

    /// Every section and every module of the enrollment snapshot is done.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending_sections() == 0 && self.pending_modules() == 0
    }

    // Mutators, used only by the progress engine.

    /// Records a completed section. Returns false if it was already present.
    pub fn record_section(&mut self, section_id: SectionId) -> bool {
        self.completed_section_ids.insert(section_id)
    }

    /// Removes a completed section. Returns false if it was not present.
    pub fn clear_section(&mut self, section_id: SectionId) -> bool {
        self.completed_section_ids.remove(&section_id)
    }

    /// Records a completed module. Returns false if it was already present.
    pub fn record_module(&mut self, module_id: ModuleId) -> bool {
        self.completed_module_ids.insert(module_id)
    }

    /// Removes a completed module. Returns false if it was not present.
    pub fn clear_module(&mut self, module_id: ModuleId) -> bool {
        self.completed_module_ids.remove(&module_id)
    }

    /// Latches the award flag. Returns true exactly once, on the transition
    /// from unawarded to awarded.
    pub fn mark_awarded(&mut self) -> bool {
        if self.awarded {
            return false;
        }
        self.awarded = true;
        true
    }
}

//
// ─── SECTION COMPLETION ────────────────────────────────────────────────────────
//

/// Per-(user, section) completion marker. Row existence is the only state:
/// created when a section is marked done, deleted when marked undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionCompletion {
    user_id: UserId,
    section_id: SectionId,
    completed_at: DateTime<Utc>,
}

impl SectionCompletion {
    #[must_use]
    pub fn new(user_id: UserId, section_id: SectionId, completed_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            section_id,
            completed_at,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn section_id(&self) -> SectionId {
        self.section_id
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn fresh() -> CourseProgress {
        CourseProgress::new_enrollment(UserId::new(1), CourseId::new(1), 4, 2, fixed_now())
    }

    #[test]
    fn enrollment_starts_with_everything_pending() {
        let progress = fresh();
        assert_eq!(progress.completed_sections(), 0);
        assert_eq!(progress.pending_sections(), 4);
        assert_eq!(progress.completed_modules(), 0);
        assert_eq!(progress.pending_modules(), 2);
        assert!(!progress.awarded());
        assert!(!progress.is_complete());
    }

    #[test]
    fn record_section_is_set_semantics() {
        let mut progress = fresh();
        assert!(progress.record_section(SectionId::new(10)));
        assert!(!progress.record_section(SectionId::new(10)));
        assert_eq!(progress.completed_sections(), 1);
        assert_eq!(progress.pending_sections(), 3);
    }

    #[test]
    fn clear_section_restores_pending() {
        let mut progress = fresh();
        progress.record_section(SectionId::new(10));
        assert!(progress.clear_section(SectionId::new(10)));
        assert!(!progress.clear_section(SectionId::new(10)));
        assert_eq!(progress.pending_sections(), 4);
    }

    #[test]
    fn completed_plus_pending_is_invariant_under_record_and_clear() {
        let mut progress = fresh();
        let total = progress.total_sections();

        for id in [1_u64, 2, 3] {
            progress.record_section(SectionId::new(id));
            assert_eq!(progress.completed_sections() + progress.pending_sections(), total);
        }
        progress.clear_section(SectionId::new(2));
        assert_eq!(progress.completed_sections() + progress.pending_sections(), total);
    }

    #[test]
    fn pending_floors_at_zero_when_set_outgrows_snapshot() {
        // Structure drift: sections added to the course after enrollment.
        let mut progress =
            CourseProgress::new_enrollment(UserId::new(1), CourseId::new(1), 1, 1, fixed_now());
        progress.record_section(SectionId::new(1));
        progress.record_section(SectionId::new(2));
        assert_eq!(progress.completed_sections(), 2);
        assert_eq!(progress.pending_sections(), 0);
    }

    #[test]
    fn mark_awarded_latches_once() {
        let mut progress = fresh();
        assert!(progress.mark_awarded());
        assert!(!progress.mark_awarded());
        assert!(progress.awarded());
    }

    #[test]
    fn from_persisted_accepts_matching_counters() {
        let progress = CourseProgress::from_persisted(
            UserId::new(1),
            CourseId::new(2),
            vec![SectionId::new(10), SectionId::new(11)],
            vec![ModuleId::new(5)],
            2,
            1,
            1,
            0,
            false,
            fixed_now(),
        )
        .unwrap();

        assert_eq!(progress.completed_sections(), 2);
        assert_eq!(progress.pending_sections(), 1);
        assert_eq!(progress.total_sections(), 3);
        assert_eq!(progress.completed_modules(), 1);
        assert_eq!(progress.total_modules(), 1);
        assert!(!progress.awarded());
    }

    #[test]
    fn from_persisted_rejects_section_counter_drift() {
        let err = CourseProgress::from_persisted(
            UserId::new(1),
            CourseId::new(2),
            vec![SectionId::new(10)],
            vec![],
            3,
            0,
            0,
            1,
            false,
            fixed_now(),
        )
        .unwrap_err();

        assert_eq!(err, ProgressError::SectionCountMismatch { counter: 3, set: 1 });
    }

    #[test]
    fn from_persisted_rejects_module_counter_drift() {
        let err = CourseProgress::from_persisted(
            UserId::new(1),
            CourseId::new(2),
            vec![],
            vec![ModuleId::new(1), ModuleId::new(2)],
            0,
            2,
            1,
            0,
            true,
            fixed_now(),
        )
        .unwrap_err();

        assert_eq!(err, ProgressError::ModuleCountMismatch { counter: 1, set: 2 });
    }

    #[test]
    fn from_persisted_dedupes_through_set_collection() {
        // Duplicate ids in the stored array collapse, so the counter no
        // longer matches and the row is rejected rather than double counted.
        let err = CourseProgress::from_persisted(
            UserId::new(1),
            CourseId::new(2),
            vec![SectionId::new(10), SectionId::new(10)],
            vec![],
            2,
            0,
            0,
            0,
            false,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ProgressError::SectionCountMismatch { counter: 2, set: 1 });
    }

    #[test]
    fn is_complete_requires_sections_and_modules() {
        let mut progress =
            CourseProgress::new_enrollment(UserId::new(1), CourseId::new(1), 1, 1, fixed_now());
        progress.record_section(SectionId::new(1));
        assert!(!progress.is_complete());
        progress.record_module(ModuleId::new(1));
        assert!(progress.is_complete());
    }
}
