#![allow(dead_code)]

use std::sync::Arc;

use quill::config::QuillConfig;
use quill::embedding::{EmbeddingProvider, EmbeddingResolver};
use quill::journal::store::EntryStore;
use quill::mode::Journal;
use tempfile::TempDir;

/// Fixed vocabulary for the deterministic test embedder. One dimension per
/// word; texts sharing words get proportionally similar vectors.
pub const VOCAB: [&str; 8] = [
    "rust", "database", "deploy", "feelings", "user", "bug", "cat", "music",
];

/// Deterministic embedding provider: dimension i counts occurrences of
/// `VOCAB[i]`. Texts with no vocabulary words embed to the zero vector.
pub struct VocabProvider;

impl EmbeddingProvider for VocabProvider {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(VOCAB
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect())
    }

    fn dimensions(&self) -> usize {
        VOCAB.len()
    }
}

/// Provider whose every call fails — for exercising the soft-failure write
/// path and backfill.
pub struct FailingProvider;

impl EmbeddingProvider for FailingProvider {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("embedding capability unavailable")
    }
}

/// A journal wired to two temp roots. Keeps the `TempDir` guards alive for
/// the duration of the test.
pub struct TestJournal {
    pub journal: Journal,
    pub project: TempDir,
    pub user: TempDir,
}

/// Config pointed at the given temp roots, remote disabled.
pub fn local_config(project: &TempDir, user: &TempDir) -> QuillConfig {
    let mut config = QuillConfig::default();
    config.storage.project_dir = project.path().display().to_string();
    config.storage.user_dir = user.path().display().to_string();
    config
}

/// Build a journal over temp roots with an injected provider.
pub fn journal_with(config: &QuillConfig, provider: Arc<dyn EmbeddingProvider>) -> Journal {
    let resolver = Arc::new(EmbeddingResolver::with_provider(provider));
    let store = EntryStore::new(
        config.resolved_project_dir(),
        config.resolved_user_dir(),
        resolver,
    );
    Journal::new(config, store).expect("journal construction")
}

/// Local-only journal with the vocabulary provider.
pub fn local_journal() -> TestJournal {
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = local_config(&project, &user);
    let journal = journal_with(&config, Arc::new(VocabProvider));
    TestJournal {
        journal,
        project,
        user,
    }
}

/// Collect all files under a root with the given extension, recursively.
pub fn files_with_ext(root: &std::path::Path, ext: &str) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(root) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(files_with_ext(&path, ext));
        } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            found.push(path);
        }
    }
    found
}
