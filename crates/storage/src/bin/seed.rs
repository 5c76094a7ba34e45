use std::fmt;

use chrono::{DateTime, Utc};
use lms_core::model::{
    Course, CourseId, CourseMaterial, CourseModule, CourseProgress, CourseSection, CourseStatus,
    MaterialId, MaterialKind, ModuleId, SectionId, User, UserId,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    course_id: CourseId,
    course_title: String,
    modules: u32,
    sections_per_module: u32,
    users: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    InvalidModules { raw: String },
    InvalidSections { raw: String },
    InvalidUsers { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course-id value: {raw}"),
            ArgsError::InvalidModules { raw } => write!(f, "invalid --modules value: {raw}"),
            ArgsError::InvalidSections { raw } => write!(f, "invalid --sections value: {raw}"),
            ArgsError::InvalidUsers { raw } => write!(f, "invalid --users value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("LMS_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut course_id = std::env::var("LMS_COURSE_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| CourseId::new(1), CourseId::new);
        let mut course_title =
            std::env::var("LMS_COURSE_TITLE").unwrap_or_else(|_| "Rust Basics".into());
        let mut modules = std::env::var("LMS_MODULES")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(3);
        let mut sections_per_module = std::env::var("LMS_SECTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(2);
        let mut users = std::env::var("LMS_USERS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(2);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--course-id" => {
                    let value = require_value(&mut args, "--course-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value.clone() })?;
                    course_id = CourseId::new(parsed);
                }
                "--course-title" => {
                    let value = require_value(&mut args, "--course-title")?;
                    course_title = value;
                }
                "--modules" => {
                    let value = require_value(&mut args, "--modules")?;
                    modules = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidModules { raw: value.clone() })?;
                }
                "--sections" => {
                    let value = require_value(&mut args, "--sections")?;
                    sections_per_module = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidSections { raw: value.clone() })?;
                }
                "--users" => {
                    let value = require_value(&mut args, "--users")?;
                    users = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidUsers { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            course_id,
            course_title,
            modules,
            sections_per_module,
            users,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --course-id <id>          Course id to upsert (default: 1)");
    eprintln!("  --course-title <name>     Course title (default: Rust Basics)");
    eprintln!("  --modules <n>             Number of modules to create (default: 3)");
    eprintln!("  --sections <n>            Sections per module (default: 2)");
    eprintln!("  --users <n>               Users to create and enroll (default: 2)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  LMS_DB_URL, LMS_COURSE_ID, LMS_COURSE_TITLE, LMS_MODULES, LMS_SECTIONS, LMS_USERS");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let course = Course::new(
        args.course_id,
        args.course_title.clone(),
        Some("Seeded demo course".into()),
        CourseStatus::Active,
        None,
        now,
    )?;
    storage.catalog.upsert_course(&course).await?;

    let module_titles = ["Ownership", "Borrowing", "Lifetimes", "Traits", "Closures"];
    let mut next_section = 1_u64;
    let mut next_material = 1_u64;
    for m in 0..args.modules {
        let title = module_titles[(m as usize) % module_titles.len()];
        let module_title = if (m as usize) < module_titles.len() {
            title.to_string()
        } else {
            format!("{} {}", title, m + 1)
        };
        let module = CourseModule::new(
            ModuleId::new(u64::from(m + 1)),
            course.id(),
            module_title,
            None,
        )?;
        storage.catalog.upsert_module(&module).await?;

        for s in 0..args.sections_per_module {
            let section = CourseSection::new(
                SectionId::new(next_section),
                module.id(),
                format!("{title} part {}", s + 1),
                None,
            )?;
            storage.catalog.upsert_section(&section).await?;

            let material = CourseMaterial::new(
                MaterialId::new(next_material),
                section.id(),
                format!("{title} notes {}", s + 1),
                MaterialKind::Text,
                Some("Seeded material body".into()),
                None,
                0,
            )?;
            storage.catalog.upsert_material(&material).await?;

            next_section += 1;
            next_material += 1;
        }
    }

    let total_sections = args.modules * args.sections_per_module;
    let first_names = ["Ada", "Grace", "Edsger", "Barbara", "Donald"];
    for u in 0..args.users {
        let first = first_names[(u as usize) % first_names.len()];
        let user = User::new(
            UserId::new(u64::from(u + 1)),
            first,
            "Seeded",
            format!("{}{}@example.com", first.to_lowercase(), u + 1),
            now,
        )?;
        storage.catalog.upsert_user(&user).await?;

        let progress = CourseProgress::new_enrollment(
            user.id(),
            course.id(),
            total_sections,
            args.modules,
            now,
        );
        match storage.progress.insert_enrollment(&progress).await {
            // Already enrolled from a previous seeding run; leave it alone.
            Ok(()) | Err(storage::repository::StorageError::Conflict) => {}
            Err(e) => return Err(e.into()),
        }
    }

    println!(
        "Seeded course {} with {} modules, {} sections, and {} enrolled users into {}",
        course.id().value(),
        args.modules,
        total_sections,
        args.users,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
