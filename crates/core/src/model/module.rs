use thiserror::Error;

use crate::model::ids::{CourseId, ModuleId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("module title cannot be empty")]
    EmptyTitle,
}

/// A module groups sections inside a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseModule {
    id: ModuleId,
    course_id: CourseId,
    title: String,
    description: Option<String>,
}

impl CourseModule {
    /// Creates a new module.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::EmptyTitle` if the title is empty or
    /// whitespace-only.
    pub fn new(
        id: ModuleId,
        course_id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, ModuleError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ModuleError::EmptyTitle);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            course_id,
            title: title.trim().to_owned(),
            description,
        })
    }

    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_new_rejects_empty_title() {
        let err = CourseModule::new(ModuleId::new(1), CourseId::new(1), " ", None).unwrap_err();
        assert_eq!(err, ModuleError::EmptyTitle);
    }

    #[test]
    fn module_trims_and_keeps_parent() {
        let module = CourseModule::new(
            ModuleId::new(2),
            CourseId::new(9),
            " Lifetimes ",
            Some("  ".into()),
        )
        .unwrap();
        assert_eq!(module.title(), "Lifetimes");
        assert_eq!(module.description(), None);
        assert_eq!(module.course_id(), CourseId::new(9));
    }
}
