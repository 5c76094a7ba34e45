use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lms_core::model::{
    Course, CourseId, CourseMaterial, CourseModule, CourseProgress, CourseSection, MaterialId,
    ModuleId, ProgressError, ScoreboardEntry, SectionCompletion, SectionId, User, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for the per-(user, course) progress aggregate.
///
/// Storage keeps both the id sets and the denormalized counters the
/// original schema carried; `into_progress` re-runs the aggregate's
/// counter cross-check so drifted rows are rejected at the boundary
/// instead of leaking into the engine.
#[derive(Debug, Clone)]
pub struct CourseProgressRecord {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub completed_sections: u32,
    pub pending_sections: u32,
    pub completed_modules: u32,
    pub pending_modules: u32,
    pub completed_section_ids: Vec<SectionId>,
    pub completed_module_ids: Vec<ModuleId>,
    pub awarded: bool,
    pub started_at: DateTime<Utc>,
}

impl CourseProgressRecord {
    #[must_use]
    pub fn from_progress(progress: &CourseProgress) -> Self {
        Self {
            user_id: progress.user_id(),
            course_id: progress.course_id(),
            completed_sections: progress.completed_sections(),
            pending_sections: progress.pending_sections(),
            completed_modules: progress.completed_modules(),
            pending_modules: progress.pending_modules(),
            completed_section_ids: progress.completed_section_ids().iter().copied().collect(),
            completed_module_ids: progress.completed_module_ids().iter().copied().collect(),
            awarded: progress.awarded(),
            started_at: progress.started_at(),
        }
    }

    /// Convert the record back into the domain aggregate.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the stored counters disagree with the id
    /// sets.
    pub fn into_progress(self) -> Result<CourseProgress, ProgressError> {
        CourseProgress::from_persisted(
            self.user_id,
            self.course_id,
            self.completed_section_ids,
            self.completed_module_ids,
            self.completed_sections,
            self.pending_sections,
            self.completed_modules,
            self.pending_modules,
            self.awarded,
            self.started_at,
        )
    }
}

/// One leaderboard line: score joined with the user's display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub score: u64,
}

/// Read access to the course hierarchy, plus the minimal upserts that
/// seeding and tests need. The progress engine only ever reads.
#[async_trait]
pub trait CourseCatalogRepository: Send + Sync {
    /// Persist or update a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be stored.
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError>;

    /// Fetch a user by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Persist or update a module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the module cannot be stored.
    async fn upsert_module(&self, module: &CourseModule) -> Result<(), StorageError>;

    /// Fetch a module by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_module(&self, id: ModuleId) -> Result<Option<CourseModule>, StorageError>;

    /// Persist or update a section.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the section cannot be stored.
    async fn upsert_section(&self, section: &CourseSection) -> Result<(), StorageError>;

    /// Fetch a section by ID. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_section(&self, id: SectionId) -> Result<Option<CourseSection>, StorageError>;

    /// Persist or update a material.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the material cannot be stored.
    async fn upsert_material(&self, material: &CourseMaterial) -> Result<(), StorageError>;

    /// All section ids belonging to a module, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn section_ids_of_module(
        &self,
        module_id: ModuleId,
    ) -> Result<Vec<SectionId>, StorageError>;

    /// All module ids belonging to a course, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn module_ids_of_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ModuleId>, StorageError>;

    /// Number of materials owned by a section.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn material_count_of_section(
        &self,
        section_id: SectionId,
    ) -> Result<u32, StorageError>;

    /// Number of sections across all modules of a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn section_count_of_course(&self, course_id: CourseId) -> Result<u32, StorageError>;
}

/// Persistence for the progress aggregate and section completion markers.
///
/// The two `apply_*` operations are the only multi-row writes in the
/// subsystem and must be atomic: every row they touch commits together or
/// not at all.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert the enrollment-time aggregate.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the (user, course) pair is
    /// already enrolled, or other storage errors.
    async fn insert_enrollment(&self, progress: &CourseProgress) -> Result<(), StorageError>;

    /// Fetch the aggregate for a (user, course) pair. `Ok(None)` when the
    /// user is not enrolled.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails or the stored row
    /// fails the counter cross-check.
    async fn get_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, StorageError>;

    /// List aggregates, optionally filtered by user and/or course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn list_progress(
        &self,
        user_id: Option<UserId>,
        course_id: Option<CourseId>,
    ) -> Result<Vec<CourseProgress>, StorageError>;

    /// Whether a completion marker exists for (user, section).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn section_completion_exists(
        &self,
        user_id: UserId,
        section_id: SectionId,
    ) -> Result<bool, StorageError>;

    /// Atomically insert the completion marker, store the updated
    /// aggregate, and (on course completion) credit the award points to the
    /// user's scoreboard row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a completion marker for the
    /// (user, section) pair already exists (the unique key is what keeps the
    /// AlreadyCompleted precondition race-free), or other storage errors.
    /// On any error no step is applied.
    async fn apply_section_done(
        &self,
        progress: &CourseProgress,
        completion: &SectionCompletion,
        award: Option<u64>,
    ) -> Result<(), StorageError>;

    /// Atomically delete the completion marker (if present) and store the
    /// updated aggregate. Never touches the scoreboard.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if persistence fails; on error no step is
    /// applied.
    async fn apply_section_undone(
        &self,
        progress: &CourseProgress,
        user_id: UserId,
        section_id: SectionId,
    ) -> Result<(), StorageError>;
}

/// Scoreboard rows: lazy creation, increment-only writes, ordered reads.
#[async_trait]
pub trait ScoreboardRepository: Send + Sync {
    /// Fetch a user's entry. `Ok(None)` when the user has never been
    /// awarded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_entry(&self, user_id: UserId) -> Result<Option<ScoreboardEntry>, StorageError>;

    /// Fetch a user's entry, creating it with a zero score when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if persistence fails.
    async fn get_or_create(&self, user_id: UserId) -> Result<ScoreboardEntry, StorageError>;

    /// Add points to a user's entry, creating it at zero first if absent.
    /// Returns the entry after the increment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if persistence fails.
    async fn add_score(
        &self,
        user_id: UserId,
        points: u64,
    ) -> Result<ScoreboardEntry, StorageError>;

    /// Full leaderboard, ordered by score descending, ties broken by first
    /// name ascending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn leaderboard(&self) -> Result<Vec<LeaderboardRow>, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    users: HashMap<UserId, User>,
    courses: HashMap<CourseId, Course>,
    modules: HashMap<ModuleId, CourseModule>,
    sections: HashMap<SectionId, CourseSection>,
    materials: HashMap<MaterialId, CourseMaterial>,
    progress: HashMap<(UserId, CourseId), CourseProgressRecord>,
    completions: HashMap<(UserId, SectionId), SectionCompletion>,
    scores: HashMap<UserId, u64>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// One mutex guards the whole state, so each repository call is atomic the
/// same way a single transaction is against the SQLite backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CourseCatalogRepository for InMemoryRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        self.lock()?.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        self.lock()?.courses.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        Ok(self.lock()?.courses.get(&id).cloned())
    }

    async fn upsert_module(&self, module: &CourseModule) -> Result<(), StorageError> {
        self.lock()?.modules.insert(module.id(), module.clone());
        Ok(())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<CourseModule>, StorageError> {
        Ok(self.lock()?.modules.get(&id).cloned())
    }

    async fn upsert_section(&self, section: &CourseSection) -> Result<(), StorageError> {
        self.lock()?.sections.insert(section.id(), section.clone());
        Ok(())
    }

    async fn get_section(&self, id: SectionId) -> Result<Option<CourseSection>, StorageError> {
        Ok(self.lock()?.sections.get(&id).cloned())
    }

    async fn upsert_material(&self, material: &CourseMaterial) -> Result<(), StorageError> {
        self.lock()?.materials.insert(material.id(), material.clone());
        Ok(())
    }

    async fn section_ids_of_module(
        &self,
        module_id: ModuleId,
    ) -> Result<Vec<SectionId>, StorageError> {
        let guard = self.lock()?;
        let mut ids: Vec<SectionId> = guard
            .sections
            .values()
            .filter(|s| s.module_id() == module_id)
            .map(CourseSection::id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn module_ids_of_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<ModuleId>, StorageError> {
        let guard = self.lock()?;
        let mut ids: Vec<ModuleId> = guard
            .modules
            .values()
            .filter(|m| m.course_id() == course_id)
            .map(CourseModule::id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn material_count_of_section(
        &self,
        section_id: SectionId,
    ) -> Result<u32, StorageError> {
        let guard = self.lock()?;
        let count = guard
            .materials
            .values()
            .filter(|m| m.section_id() == section_id)
            .count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("material count overflow".into()))
    }

    async fn section_count_of_course(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let guard = self.lock()?;
        let count = guard
            .sections
            .values()
            .filter(|s| {
                guard
                    .modules
                    .get(&s.module_id())
                    .is_some_and(|m| m.course_id() == course_id)
            })
            .count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("section count overflow".into()))
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn insert_enrollment(&self, progress: &CourseProgress) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let key = (progress.user_id(), progress.course_id());
        if guard.progress.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        guard
            .progress
            .insert(key, CourseProgressRecord::from_progress(progress));
        Ok(())
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, StorageError> {
        let guard = self.lock()?;
        guard
            .progress
            .get(&(user_id, course_id))
            .cloned()
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
        let guard = self.lock()?;
        let mut records: Vec<&CourseProgressRecord> = guard
            .progress
            .values()
            .filter(|r| user_id.is_none_or(|u| r.user_id == u))
            .filter(|r| course_id.is_none_or(|c| r.course_id == c))
            .collect();
        records.sort_by_key(|r| (r.user_id, r.course_id));

        let mut out = Vec::with_capacity(records.len());
        for record in records {
            out.push(
                record
                    .clone()
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
        Ok(self.lock()?.completions.contains_key(&(user_id, section_id)))
    }

    async fn apply_section_done(
        &self,
        progress: &CourseProgress,
        completion: &SectionCompletion,
        award: Option<u64>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let key = (completion.user_id(), completion.section_id());
        if guard.completions.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        guard.completions.insert(key, completion.clone());
        guard.progress.insert(
            (progress.user_id(), progress.course_id()),
            CourseProgressRecord::from_progress(progress),
        );
        if let Some(points) = award {
            let score = guard.scores.entry(progress.user_id()).or_insert(0);
            *score = score.saturating_add(points);
        }
        Ok(())
    }

    async fn apply_section_undone(
        &self,
        progress: &CourseProgress,
        user_id: UserId,
        section_id: SectionId,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.completions.remove(&(user_id, section_id));
        guard.progress.insert(
            (progress.user_id(), progress.course_id()),
            CourseProgressRecord::from_progress(progress),
        );
        Ok(())
    }
}

#[async_trait]
impl ScoreboardRepository for InMemoryRepository {
    async fn get_entry(&self, user_id: UserId) -> Result<Option<ScoreboardEntry>, StorageError> {
        Ok(self
            .lock()?
            .scores
            .get(&user_id)
            .map(|score| ScoreboardEntry::from_persisted(user_id, *score)))
    }

    async fn get_or_create(&self, user_id: UserId) -> Result<ScoreboardEntry, StorageError> {
        let mut guard = self.lock()?;
        let score = *guard.scores.entry(user_id).or_insert(0);
        Ok(ScoreboardEntry::from_persisted(user_id, score))
    }

    async fn add_score(
        &self,
        user_id: UserId,
        points: u64,
    ) -> Result<ScoreboardEntry, StorageError> {
        let mut guard = self.lock()?;
        let score = guard.scores.entry(user_id).or_insert(0);
        *score = score.saturating_add(points);
        Ok(ScoreboardEntry::from_persisted(user_id, *score))
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardRow>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<LeaderboardRow> = guard
            .scores
            .iter()
            .filter_map(|(user_id, score)| {
                guard.users.get(user_id).map(|user| LeaderboardRow {
                    user_id: *user_id,
                    first_name: user.first_name().to_owned(),
                    last_name: user.last_name().to_owned(),
                    email: user.email().to_owned(),
                    score: *score,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(rows)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CourseCatalogRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub scoreboard: Arc<dyn ScoreboardRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let catalog: Arc<dyn CourseCatalogRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let scoreboard: Arc<dyn ScoreboardRepository> = Arc::new(repo);
        Self {
            catalog,
            progress,
            scoreboard,
        }
    }
}
