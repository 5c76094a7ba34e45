use thiserror::Error;
use url::Url;

use crate::model::ids::{MaterialId, SectionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MaterialError {
    #[error("material title cannot be empty")]
    EmptyTitle,

    #[error("material URL is not valid: {0}")]
    InvalidUrl(String),

    #[error("unknown material kind: {0}")]
    UnknownKind(String),
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// What a material is made of. Videos and documents point at an uploaded
/// file; text materials carry their body inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    Video,
    Document,
    Text,
}

impl MaterialKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialKind::Video => "video",
            MaterialKind::Document => "document",
            MaterialKind::Text => "text",
        }
    }

    /// Decodes the stored string form.
    ///
    /// # Errors
    ///
    /// Returns `MaterialError::UnknownKind` for unrecognized values.
    pub fn parse(s: &str) -> Result<Self, MaterialError> {
        match s {
            "video" => Ok(MaterialKind::Video),
            "document" => Ok(MaterialKind::Document),
            "text" => Ok(MaterialKind::Text),
            other => Err(MaterialError::UnknownKind(other.to_string())),
        }
    }
}

//
// ─── MATERIAL ──────────────────────────────────────────────────────────────────
//

/// A single piece of learning content inside a section.
///
/// A section must own at least one material before it can be marked
/// complete; the progress engine enforces that rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseMaterial {
    id: MaterialId,
    section_id: SectionId,
    title: String,
    kind: MaterialKind,
    content: Option<String>,
    url: Option<Url>,
    sort_order: u32,
}

impl CourseMaterial {
    /// Creates a new material.
    ///
    /// # Errors
    ///
    /// Returns `MaterialError::EmptyTitle` for a blank title, or
    /// `MaterialError::InvalidUrl` if the URL does not parse.
    pub fn new(
        id: MaterialId,
        section_id: SectionId,
        title: impl Into<String>,
        kind: MaterialKind,
        content: Option<String>,
        url: Option<&str>,
        sort_order: u32,
    ) -> Result<Self, MaterialError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(MaterialError::EmptyTitle);
        }

        let content = content
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        let url = url
            .map(|raw| Url::parse(raw).map_err(|_| MaterialError::InvalidUrl(raw.into())))
            .transpose()?;

        Ok(Self {
            id,
            section_id,
            title: title.trim().to_owned(),
            kind,
            content,
            url,
            sort_order,
        })
    }

    #[must_use]
    pub fn id(&self) -> MaterialId {
        self.id
    }

    #[must_use]
    pub fn section_id(&self) -> SectionId {
        self.section_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    #[must_use]
    pub fn sort_order(&self) -> u32 {
        self.sort_order
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
