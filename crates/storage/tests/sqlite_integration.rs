use lms_core::model::{
    Course, CourseId, CourseMaterial, CourseModule, CourseProgress, CourseSection, CourseStatus,
    MaterialId, MaterialKind, ModuleId, SectionCompletion, SectionId, User, UserId,
};
use lms_core::time::fixed_now;
use storage::repository::{
    CourseCatalogRepository, ProgressRepository, ScoreboardRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn seed_one_module_course(repo: &SqliteRepository) {
    let user = User::new(UserId::new(1), "Ada", "Lovelace", "ada@example.com", fixed_now()).unwrap();
    repo.upsert_user(&user).await.unwrap();

    let course = Course::new(
        CourseId::new(1),
        "Rust Basics",
        Some("intro course".into()),
        CourseStatus::Active,
        Some("https://videos.example.com/intro.mp4"),
        fixed_now(),
    )
    .unwrap();
    repo.upsert_course(&course).await.unwrap();

    let module = CourseModule::new(ModuleId::new(1), course.id(), "Ownership", None).unwrap();
    repo.upsert_module(&module).await.unwrap();

    for id in [1_u64, 2] {
        let section =
            CourseSection::new(SectionId::new(id), module.id(), format!("Section {id}"), None)
                .unwrap();
        repo.upsert_section(&section).await.unwrap();

        let material = CourseMaterial::new(
            MaterialId::new(id),
            section.id(),
            format!("Notes {id}"),
            MaterialKind::Text,
            Some("body".into()),
            None,
            0,
        )
        .unwrap();
        repo.upsert_material(&material).await.unwrap();
    }
}

#[tokio::test]
async fn sqlite_roundtrips_hierarchy_and_enrollment() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    seed_one_module_course(&repo).await;

    let course = repo.get_course(CourseId::new(1)).await.unwrap().unwrap();
    assert_eq!(course.title(), "Rust Basics");
    assert!(course.is_active());
    assert_eq!(
        course.intro_video_url().map(|u| u.as_str()),
        Some("https://videos.example.com/intro.mp4")
    );

    assert_eq!(
        repo.module_ids_of_course(CourseId::new(1)).await.unwrap(),
        vec![ModuleId::new(1)]
    );
    assert_eq!(
        repo.section_ids_of_module(ModuleId::new(1)).await.unwrap(),
        vec![SectionId::new(1), SectionId::new(2)]
    );
    assert_eq!(repo.section_count_of_course(CourseId::new(1)).await.unwrap(), 2);
    assert_eq!(
        repo.material_count_of_section(SectionId::new(1)).await.unwrap(),
        1
    );

    let progress =
        CourseProgress::new_enrollment(UserId::new(1), CourseId::new(1), 2, 1, fixed_now());
    repo.insert_enrollment(&progress).await.unwrap();

    let fetched = repo
        .get_progress(UserId::new(1), CourseId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.total_sections(), 2);
    assert_eq!(fetched.total_modules(), 1);
    assert_eq!(fetched.pending_sections(), 2);
    assert!(!fetched.awarded());

    let err = repo.insert_enrollment(&progress).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_apply_section_done_is_atomic_and_conflict_safe() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_apply?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    seed_one_module_course(&repo).await;

    let mut progress =
        CourseProgress::new_enrollment(UserId::new(1), CourseId::new(1), 2, 1, fixed_now());
    repo.insert_enrollment(&progress).await.unwrap();

    // First section done, no award yet.
    progress.record_section(SectionId::new(1));
    let completion = SectionCompletion::new(UserId::new(1), SectionId::new(1), fixed_now());
    repo.apply_section_done(&progress, &completion, None)
        .await
        .unwrap();
    assert!(repo
        .section_completion_exists(UserId::new(1), SectionId::new(1))
        .await
        .unwrap());

    // Re-applying the same completion conflicts and changes nothing.
    let err = repo
        .apply_section_done(&progress, &completion, Some(100))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
    assert!(repo.get_entry(UserId::new(1)).await.unwrap().is_none());

    // Second section completes the course and credits the award.
    progress.record_section(SectionId::new(2));
    progress.record_module(ModuleId::new(1));
    progress.mark_awarded();
    let completion = SectionCompletion::new(UserId::new(1), SectionId::new(2), fixed_now());
    repo.apply_section_done(&progress, &completion, Some(100))
        .await
        .unwrap();

    let stored = repo
        .get_progress(UserId::new(1), CourseId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.awarded());
    assert_eq!(stored.completed_sections(), 2);
    assert_eq!(stored.completed_modules(), 1);
    assert!(stored.has_section(SectionId::new(1)));
    assert!(stored.has_section(SectionId::new(2)));

    let entry = repo.get_entry(UserId::new(1)).await.unwrap().unwrap();
    assert_eq!(entry.score(), 100);

    // Undo one section: marker gone, counts move, award and score stay.
    let mut reopened = stored.clone();
    reopened.clear_section(SectionId::new(2));
    reopened.clear_module(ModuleId::new(1));
    repo.apply_section_undone(&reopened, UserId::new(1), SectionId::new(2))
        .await
        .unwrap();

    assert!(!repo
        .section_completion_exists(UserId::new(1), SectionId::new(2))
        .await
        .unwrap());
    let after = repo
        .get_progress(UserId::new(1), CourseId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert!(after.awarded());
    assert_eq!(after.pending_sections(), 1);
    assert_eq!(repo.get_entry(UserId::new(1)).await.unwrap().unwrap().score(), 100);
}

#[tokio::test]
async fn sqlite_leaderboard_joins_users_and_orders() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_board?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    for (id, first) in [(1_u64, "Niklaus"), (2, "Grace"), (3, "Barbara")] {
        let user = User::new(
            UserId::new(id),
            first,
            "Tester",
            format!("{}@example.com", first.to_lowercase()),
            fixed_now(),
        )
        .unwrap();
        repo.upsert_user(&user).await.unwrap();
    }

    // Lazily created at zero, then incremented.
    let entry = repo.get_or_create(UserId::new(1)).await.unwrap();
    assert_eq!(entry.score(), 0);

    repo.add_score(UserId::new(1), 155).await.unwrap();
    repo.add_score(UserId::new(2), 199).await.unwrap();
    repo.add_score(UserId::new(3), 199).await.unwrap();
    // Increments accumulate on the existing row.
    let entry = repo.add_score(UserId::new(1), 45).await.unwrap();
    assert_eq!(entry.score(), 200);

    let rows = repo.leaderboard().await.unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r.first_name.as_str()).collect();
    assert_eq!(names, vec!["Niklaus", "Barbara", "Grace"]);
    assert_eq!(rows[0].score, 200);
}
