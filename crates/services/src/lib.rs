#![forbid(unsafe_code)]

pub mod app_services;
pub mod enrollment_service;
pub mod error;
pub mod progress_service;
pub mod quote_service;
pub mod scoreboard_service;
pub mod summary_service;

pub use lms_core::Clock;

pub use error::{
    AppServicesError, EnrollmentError, ProgressServiceError, QuoteError, ScoreboardServiceError,
    SummaryError,
};

pub use app_services::AppServices;
pub use enrollment_service::EnrollmentService;
pub use progress_service::{ProgressService, ProgressUpdate};
pub use quote_service::{Quote, QuoteConfig, QuoteService};
pub use scoreboard_service::ScoreboardService;
pub use summary_service::{CompletionStatus, ProgressSummary, SummaryService};
