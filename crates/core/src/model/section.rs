use thiserror::Error;

use crate::model::ids::{ModuleId, SectionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SectionError {
    #[error("section title cannot be empty")]
    EmptyTitle,
}

/// A section groups materials inside a module. Sections are the unit of
/// completion tracking: marking one done is what moves course progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSection {
    id: SectionId,
    module_id: ModuleId,
    title: String,
    description: Option<String>,
}

impl CourseSection {
    /// Creates a new section.
    ///
    /// # Errors
    ///
    /// Returns `SectionError::EmptyTitle` if the title is empty or
    /// whitespace-only.
    pub fn new(
        id: SectionId,
        module_id: ModuleId,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, SectionError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(SectionError::EmptyTitle);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            module_id,
            title: title.trim().to_owned(),
            description,
        })
    }

    #[must_use]
    pub fn id(&self) -> SectionId {
        self.id
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
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
    fn section_new_rejects_empty_title() {
        let err = CourseSection::new(SectionId::new(1), ModuleId::new(1), "\t", None).unwrap_err();
        assert_eq!(err, SectionError::EmptyTitle);
    }

    #[test]
    fn section_keeps_parent_module() {
        let section = CourseSection::new(
            SectionId::new(4),
            ModuleId::new(2),
            "Borrow checker",
            Some("rules".into()),
        )
        .unwrap();
        assert_eq!(section.module_id(), ModuleId::new(2));
        assert_eq!(section.description(), Some("rules"));
    }
}
