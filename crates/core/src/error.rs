use thiserror::Error;

use crate::model::{CourseError, MaterialError, ModuleError, ProgressError, SectionError, UserError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    User(#[from] UserError),
}
