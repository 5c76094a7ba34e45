use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::model::ids::CourseId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("intro video URL is not valid: {0}")]
    InvalidIntroVideoUrl(String),

    #[error("unknown course status: {0}")]
    UnknownStatus(i64),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Publication state of a course. Only active courses accept enrollments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseStatus {
    Inactive,
    Active,
}

impl CourseStatus {
    /// Storage encoding: Inactive=0, Active=1.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            CourseStatus::Inactive => 0,
            CourseStatus::Active => 1,
        }
    }

    /// Decodes the stored integer form.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::UnknownStatus` for values outside 0..=1.
    pub fn from_i64(value: i64) -> Result<Self, CourseError> {
        match value {
            0 => Ok(CourseStatus::Inactive),
            1 => Ok(CourseStatus::Active),
            other => Err(CourseError::UnknownStatus(other)),
        }
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// Top of the content hierarchy: a course contains modules, which contain
/// sections, which contain materials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    status: CourseStatus,
    intro_video_url: Option<Url>,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Creates a new Course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` if the title is empty or
    /// whitespace-only, or `CourseError::InvalidIntroVideoUrl` if the intro
    /// video URL does not parse.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        status: CourseStatus,
        intro_video_url: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        let intro_video_url = intro_video_url
            .map(|raw| Url::parse(raw).map_err(|_| CourseError::InvalidIntroVideoUrl(raw.into())))
            .transpose()?;

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description,
            status,
            intro_video_url,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> CourseStatus {
        self.status
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == CourseStatus::Active
    }

    #[must_use]
    pub fn intro_video_url(&self) -> Option<&Url> {
        self.intro_video_url.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn course_new_rejects_empty_title() {
        let err = Course::new(
            CourseId::new(1),
            "   ",
            None,
            CourseStatus::Active,
            None,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, CourseError::EmptyTitle);
    }

    #[test]
    fn course_new_rejects_bad_intro_url() {
        let err = Course::new(
            CourseId::new(1),
            "Rust Basics",
            None,
            CourseStatus::Active,
            Some("not a url"),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, CourseError::InvalidIntroVideoUrl(_)));
    }

    #[test]
    fn course_trims_title_and_description() {
        let course = Course::new(
            CourseId::new(10),
            "  Rust Basics  ",
            Some("  ownership + borrowing  ".into()),
            CourseStatus::Active,
            Some("https://videos.example.com/intro.mp4"),
            fixed_now(),
        )
        .unwrap();

        assert_eq!(course.title(), "Rust Basics");
        assert_eq!(course.description(), Some("ownership + borrowing"));
        assert!(course.is_active());
        assert_eq!(
            course.intro_video_url().map(Url::as_str),
            Some("https://videos.example.com/intro.mp4")
        );
    }

    #[test]
    fn status_roundtrips_through_storage_encoding() {
        assert_eq!(
            CourseStatus::from_i64(CourseStatus::Active.as_i64()).unwrap(),
            CourseStatus::Active
        );
        assert_eq!(
            CourseStatus::from_i64(CourseStatus::Inactive.as_i64()).unwrap(),
            CourseStatus::Inactive
        );
        assert_eq!(
            CourseStatus::from_i64(9).unwrap_err(),
            CourseError::UnknownStatus(9)
        );
    }
}
