//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`.
///
/// The first four kinds are the user-facing precondition failures; callers
/// are expected to surface a clear message, not retry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("user is not enrolled in this course")]
    NotEnrolled,

    #[error("section is already completed")]
    AlreadyCompleted,

    #[error("section has no materials and cannot be completed")]
    EmptySection,

    #[error("section, module, or course not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `EnrollmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("course not found")]
    CourseNotFound,

    #[error("course is not accepting enrollments")]
    CourseInactive,

    #[error("user not found")]
    UserNotFound,

    #[error("user is already enrolled in this course")]
    AlreadyEnrolled,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SummaryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SummaryError {
    #[error("user is not enrolled in this course")]
    NotEnrolled,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ScoreboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoreboardServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuoteService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuoteError {
    #[error("quote fetching is not configured")]
    Disabled,

    #[error("quote API returned an empty response")]
    EmptyResponse,

    #[error("quote API request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
