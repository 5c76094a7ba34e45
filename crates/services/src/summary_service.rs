use std::sync::Arc;

use chrono::{DateTime, Utc};

use lms_core::model::{CourseId, CourseProgress, UserId};
use storage::repository::ProgressRepository;

use crate::error::SummaryError;

//
// ─── COMPLETION STATUS ─────────────────────────────────────────────────────────
//

/// Coarse progress bucket shown next to the percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Started,
    Progressing,
    Close,
    Completed,
}

impl CompletionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::Started => "Started",
            CompletionStatus::Progressing => "Progressing",
            CompletionStatus::Close => "Close",
            CompletionStatus::Completed => "Completed",
        }
    }
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// Read model for progress listings: counts, a unified percentage over
/// sections and modules combined, and the status bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSummary {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub completed_sections: u32,
    pub total_sections: u32,
    pub completed_modules: u32,
    pub total_modules: u32,
    pub completion_percentage: f64,
    pub status: CompletionStatus,
    pub awarded: bool,
    pub started_at: DateTime<Utc>,
}

impl ProgressSummary {
    /// Derives the summary from a progress aggregate.
    ///
    /// Sections and modules are pooled into one item count, so a course
    /// with 4 sections and 2 modules reaches 100% only when all 6 are done.
    #[must_use]
    pub fn from_progress(progress: &CourseProgress) -> Self {
        let completed_items = progress.completed_sections() + progress.completed_modules();
        let total_items = progress.total_sections() + progress.total_modules();

        let percentage = if total_items > 0 {
            (f64::from(completed_items) / f64::from(total_items)) * 100.0
        } else {
            0.0
        };
        let percentage = (percentage * 100.0).round() / 100.0;

        let status = if total_items > 0 && completed_items >= total_items {
            CompletionStatus::Completed
        } else if percentage >= 60.0 {
            CompletionStatus::Close
        } else if percentage >= 40.0 {
            CompletionStatus::Progressing
        } else {
            CompletionStatus::Started
        };

        Self {
            user_id: progress.user_id(),
            course_id: progress.course_id(),
            completed_sections: progress.completed_sections(),
            total_sections: progress.total_sections(),
            completed_modules: progress.completed_modules(),
            total_modules: progress.total_modules(),
            completion_percentage: percentage,
            status,
            awarded: progress.awarded(),
            started_at: progress.started_at(),
        }
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-only progress views for summary endpoints. Never writes.
pub struct SummaryService {
    progress: Arc<dyn ProgressRepository>,
}

impl SummaryService {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>) -> Self {
        Self { progress }
    }

    /// Summary for one (user, course) pair.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::NotEnrolled` if no progress row exists, or
    /// storage errors.
    pub async fn summary(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<ProgressSummary, SummaryError> {
        let progress = self
            .progress
            .get_progress(user_id, course_id)
            .await?
            .ok_or(SummaryError::NotEnrolled)?;
        Ok(ProgressSummary::from_progress(&progress))
    }

    /// Summaries filtered by user and/or course; both `None` lists
    /// everything, ordered by (user, course).
    ///
    /// # Errors
    ///
    /// Returns storage errors from the underlying listing.
    pub async fn list(
        &self,
        user_id: Option<UserId>,
        course_id: Option<CourseId>,
    ) -> Result<Vec<ProgressSummary>, SummaryError> {
        let rows = self.progress.list_progress(user_id, course_id).await?;
        Ok(rows.iter().map(ProgressSummary::from_progress).collect())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
