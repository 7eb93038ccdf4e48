//! Write path — entry persistence, vector derivation, and backfill.
//!
//! Entries are plain files under two roots (project and user locality),
//! grouped into `YYYY-MM-DD` day folders. Each content document gets a
//! sibling `.embedding` vector document, written atomically after the
//! content is safely on disk. Vector derivation failure never loses an
//! entry — it is logged and the vector is left for backfill to regenerate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::embedding::EmbeddingResolver;
use crate::error::{JournalError, Result};
use crate::journal::document::{self, EntryStamp};
use crate::journal::types::{
    Locality, Sections, VectorDocument, WriteReceipt, WrittenEntry,
};

/// File extension for vector documents, siblings of `.md` content files.
pub const VECTOR_EXT: &str = "embedding";

/// Local entry storage across both locality roots.
pub struct EntryStore {
    project_root: PathBuf,
    user_root: PathBuf,
    resolver: Arc<EmbeddingResolver>,
}

impl EntryStore {
    pub fn new(
        project_root: PathBuf,
        user_root: PathBuf,
        resolver: Arc<EmbeddingResolver>,
    ) -> Self {
        Self {
            project_root,
            user_root,
            resolver,
        }
    }

    pub fn root(&self, locality: Locality) -> &Path {
        match locality {
            Locality::Project => &self.project_root,
            Locality::User => &self.user_root,
        }
    }

    pub fn resolver(&self) -> &Arc<EmbeddingResolver> {
        &self.resolver
    }

    /// Persist a free-text entry under the project locality.
    pub async fn write_free_text(&self, text: &str) -> Result<WriteReceipt> {
        if text.trim().is_empty() {
            return Err(JournalError::usage("entry text must not be empty"));
        }
        let stamp = EntryStamp::now();
        let rendered = document::render_free_text(&stamp, text);
        let written = self
            .write_document(Locality::Project, &stamp, &rendered, text, Vec::new())
            .await?;
        Ok(WriteReceipt {
            entries: vec![written],
        })
    }

    /// Persist a structured entry, splitting sections across localities per
    /// the static routing table. Writes at most one document per locality
    /// that actually received content; an untouched locality gets no
    /// directory at all.
    pub async fn write_sections(&self, sections: &Sections) -> Result<WriteReceipt> {
        if sections.is_empty() {
            return Err(JournalError::usage("at least one section must be provided"));
        }
        let stamp = EntryStamp::now();
        let mut entries = Vec::new();

        for locality in [Locality::Project, Locality::User] {
            let routed: Vec<_> = sections
                .populated()
                .into_iter()
                .filter(|(key, _)| key.locality() == locality)
                .collect();
            if routed.is_empty() {
                continue;
            }
            let rendered = document::render_sections(&stamp, &routed);
            let labels = routed.iter().map(|(k, _)| k.heading().to_string()).collect();
            // Embed the body as written, headings included, so backfill
            // produces the identical vector text.
            let body = document::sections_body(&routed);
            let written = self
                .write_document(locality, &stamp, &rendered, &body, labels)
                .await?;
            entries.push(written);
        }

        Ok(WriteReceipt { entries })
    }

    /// Persist one content document, then derive and persist its vector.
    ///
    /// The content file is always fully written before derivation begins.
    /// Derivation failure is swallowed here — the entry must never be lost
    /// because the embedding capability failed.
    async fn write_document(
        &self,
        locality: Locality,
        stamp: &EntryStamp,
        rendered: &str,
        vector_text: &str,
        section_labels: Vec<String>,
    ) -> Result<WrittenEntry> {
        let day_dir = self.root(locality).join(stamp.day_key());
        tokio::fs::create_dir_all(&day_dir).await?;

        let path = day_dir.join(entry_file_name(stamp));
        tokio::fs::write(&path, rendered).await?;
        debug!(path = %path.display(), %locality, "entry written");

        let vector = match self.resolver.embed(vector_text).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "vector derivation failed, entry kept without embedding");
                None
            }
        };

        let mut vector_written = false;
        if let Some(embedding) = &vector {
            let doc = VectorDocument {
                embedding: embedding.clone(),
                text: vector_text.to_string(),
                sections: section_labels,
                timestamp: stamp.epoch_ms,
                path: path.to_string_lossy().into_owned(),
            };
            match write_vector_document(&path, &doc).await {
                Ok(()) => vector_written = true,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "vector document write failed");
                }
            }
        }

        Ok(WrittenEntry {
            locality,
            path,
            timestamp: stamp.epoch_ms,
            vector_written,
            embedding: vector,
        })
    }

    /// Read one content document. Absent file maps to `None`; any other I/O
    /// failure propagates.
    pub async fn read_entry(&self, path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Regenerate missing vector documents across both roots.
    ///
    /// Skips non-directories, directories not named exactly `YYYY-MM-DD`,
    /// and individual unreadable or malformed documents. Scan-level errors
    /// (missing root, permissions) yield 0, never an error. Idempotent and
    /// safe to re-run.
    pub async fn generate_missing_embeddings(&self) -> usize {
        let mut generated = 0;
        for locality in [Locality::Project, Locality::User] {
            generated += self.backfill_root(self.root(locality)).await;
        }
        generated
    }

    async fn backfill_root(&self, root: &Path) -> usize {
        let mut day_dirs = match tokio::fs::read_dir(root).await {
            Ok(rd) => rd,
            Err(e) => {
                debug!(root = %root.display(), error = %e, "backfill skipping unreadable root");
                return 0;
            }
        };

        let mut generated = 0;
        while let Ok(Some(day)) = day_dirs.next_entry().await {
            let name = day.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_day_key(name) {
                continue;
            }
            if !day.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            generated += self.backfill_day_dir(&day.path()).await;
        }
        generated
    }

    async fn backfill_day_dir(&self, dir: &Path) -> usize {
        let mut files = match tokio::fs::read_dir(dir).await {
            Ok(rd) => rd,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "backfill skipping unreadable day folder");
                return 0;
            }
        };

        let mut generated = 0;
        while let Ok(Some(entry)) = files.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let vector_path = path.with_extension(VECTOR_EXT);
            if tokio::fs::try_exists(&vector_path).await.unwrap_or(false) {
                continue;
            }
            match self.backfill_one(&path).await {
                Ok(()) => generated += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "backfill skipping document");
                }
            }
        }
        generated
    }

    async fn backfill_one(&self, path: &Path) -> Result<()> {
        let content = tokio::fs::read_to_string(path).await?;
        let parsed = document::parse(&content)
            .ok_or_else(|| JournalError::usage("malformed content document"))?;
        // Hard failure here: embedding is the sole purpose of this call.
        let embedding = self.resolver.embed(&parsed.body).await?;
        let doc = VectorDocument {
            embedding,
            text: parsed.body,
            sections: parsed.sections,
            timestamp: parsed.timestamp,
            path: path.to_string_lossy().into_owned(),
        };
        write_vector_document(path, &doc).await
    }
}

/// Time-of-day file name with a sub-millisecond disambiguator:
/// `HH-MM-SS-mmmRRR.md` where `RRR` is a random tie-breaker. Uniqueness
/// under bursty concurrent writes within one clock millisecond is
/// probabilistic, not guaranteed.
fn entry_file_name(stamp: &EntryStamp) -> String {
    let tiebreak: u16 = rand::rng().random_range(0..1000);
    format!(
        "{}-{:03}{:03}.md",
        stamp.local.format("%H-%M-%S"),
        stamp.epoch_ms.rem_euclid(1000),
        tiebreak,
    )
}

/// True iff `name` is exactly `YYYY-MM-DD`.
pub fn is_day_key(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| matches!(i, 4 | 7) || b.is_ascii_digit())
}

/// Write a vector document atomically: serialize, write to a `.tmp` sibling,
/// then rename over the final path. A reader never observes a partial file.
async fn write_vector_document(content_path: &Path, doc: &VectorDocument) -> Result<()> {
    let final_path = content_path.with_extension(VECTOR_EXT);
    let tmp_path = content_path.with_extension("embedding.tmp");

    let json = serde_json::to_vec_pretty(doc)?;
    let mut file = tokio::fs::File::create(&tmp_path).await?;
    file.write_all(&json).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, &final_path).await?;
    Ok(())
}
