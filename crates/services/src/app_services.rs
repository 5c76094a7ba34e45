use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::quote_service::QuoteService;
use crate::scoreboard_service::ScoreboardService;
use crate::summary_service::SummaryService;

/// Assembles the progress-tracking services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    enrollment: Arc<EnrollmentService>,
    progress: Arc<ProgressService>,
    summaries: Arc<SummaryService>,
    scoreboard: Arc<ScoreboardService>,
    quotes: Arc<QuoteService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over an already-initialized storage aggregate.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let enrollment = Arc::new(EnrollmentService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
        ));
        let summaries = Arc::new(SummaryService::new(Arc::clone(&storage.progress)));
        let scoreboard = Arc::new(ScoreboardService::new(Arc::clone(&storage.scoreboard)));
        let quotes = Arc::new(QuoteService::from_env());

        Self {
            enrollment,
            progress,
            summaries,
            scoreboard,
            quotes,
        }
    }

    #[must_use]
    pub fn enrollment(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollment)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn summaries(&self) -> Arc<SummaryService> {
        Arc::clone(&self.summaries)
    }

    #[must_use]
    pub fn scoreboard(&self) -> Arc<ScoreboardService> {
        Arc::clone(&self.scoreboard)
    }

    #[must_use]
    pub fn quotes(&self) -> Arc<QuoteService> {
        Arc::clone(&self.quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::model::{CourseId, UserId};
    use lms_core::time::fixed_clock;

    #[tokio::test]
    async fn services_share_the_storage_backend() {
        let storage = Storage::in_memory();
        let services = AppServices::from_storage(&storage, fixed_clock());

        // Nothing enrolled yet, but both read paths answer over the same
        // backing store.
        let summaries = services.summaries().list(None, None).await.unwrap();
        assert!(summaries.is_empty());
        assert_eq!(
            services.scoreboard().score_for(UserId::new(1)).await.unwrap(),
            0
        );
        let err = services
            .summaries()
            .summary(UserId::new(1), CourseId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::SummaryError::NotEnrolled));
    }
}
