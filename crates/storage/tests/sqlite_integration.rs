use storage::repository::{ProgressStore, Storage};
use storage::sqlite::SqliteRepository;

#[tokio::test]
async fn sqlite_roundtrips_flags_and_ledger() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get("progress_section_0").await.unwrap(), None);

    repo.set("progress_section_0", "true").await.unwrap();
    repo.set("devops_course_progress", r#"{"docker":50}"#)
        .await
        .unwrap();

    assert_eq!(
        repo.get("progress_section_0").await.unwrap().as_deref(),
        Some("true")
    );
    assert_eq!(
        repo.get("devops_course_progress").await.unwrap().as_deref(),
        Some(r#"{"docker":50}"#)
    );
}

#[tokio::test]
async fn sqlite_overwrites_existing_keys() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_overwrite?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.set("validation_check-build", "true").await.unwrap();
    repo.set("validation_check-build", "false").await.unwrap();

    assert_eq!(
        repo.get("validation_check-build").await.unwrap().as_deref(),
        Some("false")
    );

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM progress_entries")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.set("k", "v").await.unwrap();
    repo.migrate().await.expect("second migrate");

    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn values_survive_reconnecting_to_the_same_file() {
    let dir = std::env::temp_dir().join(format!("progress-store-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("profile.sqlite3");
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}?mode=rwc", path.display());

    {
        let storage = Storage::sqlite(&url).await.expect("open");
        storage.progress.set("progress_exercise_0", "true").await.unwrap();
    }

    let reopened = SqliteRepository::connect(&url).await.expect("reopen");
    reopened.migrate().await.unwrap();
    assert_eq!(
        reopened.get("progress_exercise_0").await.unwrap().as_deref(),
        Some("true")
    );
    reopened.close().await;
    let _ = std::fs::remove_dir_all(&dir);
}
