mod course;
mod ids;
mod material;
mod module;
mod progress;
mod scoreboard;
mod section;
mod user;

pub use ids::{CourseId, MaterialId, ModuleId, ParseIdError, SectionId, UserId};

pub use course::{Course, CourseError, CourseStatus};
pub use material::{CourseMaterial, MaterialError, MaterialKind};
pub use module::{CourseModule, ModuleError};
pub use progress::{CourseProgress, ProgressError, SectionCompletion};
pub use section::{CourseSection, SectionError};
pub use scoreboard::{ScoreboardEntry, reward_points};
pub use user::{User, UserError};
