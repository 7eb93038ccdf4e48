mod helpers;

use std::sync::Arc;

use helpers::{files_with_ext, journal_with, local_config, FailingProvider, VocabProvider};
use tempfile::TempDir;

#[tokio::test]
async fn backfill_regenerates_missing_vectors() {
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = local_config(&project, &user);

    // Write entries while the embedding capability is down — content
    // documents land on disk without vectors.
    let broken = journal_with(&config, Arc::new(FailingProvider));
    broken.write_free_text("rust rust").await.unwrap();
    broken.write_free_text("database deploy").await.unwrap();
    assert!(files_with_ext(project.path(), "embedding").is_empty());

    // Capability restored: backfill fills the gaps.
    let healthy = journal_with(&config, Arc::new(VocabProvider));
    assert_eq!(healthy.backfill().await, 2);
    assert_eq!(files_with_ext(project.path(), "embedding").len(), 2);

    // Idempotent: nothing left to generate.
    assert_eq!(healthy.backfill().await, 0);

    // The regenerated vectors are immediately searchable.
    let results = healthy
        .search("rust", &quill::journal::types::SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!((results[0].score - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn backfill_ignores_foreign_directories_and_files() {
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = local_config(&project, &user);

    // Junk that must not be scanned: a non-day directory, a loose file at
    // the root, and a non-md file inside a valid day folder.
    std::fs::create_dir(project.path().join("notes")).unwrap();
    std::fs::write(project.path().join("notes").join("x.md"), "ignored").unwrap();
    std::fs::write(project.path().join("README.txt"), "ignored").unwrap();
    let day = project.path().join("2025-07-09");
    std::fs::create_dir(&day).unwrap();
    std::fs::write(day.join("scratch.txt"), "ignored").unwrap();

    let journal = journal_with(&config, Arc::new(VocabProvider));
    assert_eq!(journal.backfill().await, 0);
}

#[tokio::test]
async fn backfill_skips_malformed_documents_without_aborting() {
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = local_config(&project, &user);

    let broken = journal_with(&config, Arc::new(FailingProvider));
    broken.write_free_text("rust entry").await.unwrap();

    // A document with no envelope sits in the same folder.
    let day = files_with_ext(project.path(), "md")[0]
        .parent()
        .unwrap()
        .to_path_buf();
    std::fs::write(day.join("08-00-00-000000.md"), "no envelope here").unwrap();

    let healthy = journal_with(&config, Arc::new(VocabProvider));
    // Only the well-formed document gains a vector.
    assert_eq!(healthy.backfill().await, 1);
    assert_eq!(files_with_ext(project.path(), "embedding").len(), 1);
}

#[tokio::test]
async fn backfill_on_missing_roots_returns_zero() {
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let mut config = local_config(&project, &user);
    config.storage.project_dir = "/nonexistent/quill-project".into();
    config.storage.user_dir = "/nonexistent/quill-user".into();

    let journal = journal_with(&config, Arc::new(VocabProvider));
    assert_eq!(journal.backfill().await, 0);
}

#[tokio::test]
async fn backfill_covers_both_localities() {
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = local_config(&project, &user);

    let broken = journal_with(&config, Arc::new(FailingProvider));
    broken
        .write_sections(&quill::journal::types::Sections {
            project_notes: Some("deploy pipeline".into()),
            feelings: Some("feelings about the bug".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let healthy = journal_with(&config, Arc::new(VocabProvider));
    assert_eq!(healthy.backfill().await, 2);
    assert_eq!(files_with_ext(project.path(), "embedding").len(), 1);
    assert_eq!(files_with_ext(user.path(), "embedding").len(), 1);
}
