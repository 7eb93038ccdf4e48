//! Mode arbitration — one policy, fixed at construction, for every operation.
//!
//! | Operation   | Hybrid                         | Remote-only          | Local      |
//! |-------------|--------------------------------|----------------------|------------|
//! | write       | local + best-effort mirror     | remote, failure hard | local only |
//! | search/list | local brute-force              | remote, failure hard | local only |
//! | read one    | local file read                | remote fetch         | local only |
//!
//! Call sites never re-check remote flags; they go through [`Journal`] and
//! the policy decided here.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use tracing::warn;

use crate::config::QuillConfig;
use crate::error::{JournalError, Result};
use crate::journal::search;
use crate::journal::store::EntryStore;
use crate::journal::types::{
    ListOptions, SearchOptions, SearchResult, Sections, WriteReceipt,
};
use crate::journal::uri;
use crate::remote::{self, RemoteClient};

/// Where each operation executes, decided once from [`crate::config::RemoteConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No remote configured; everything is local.
    Local,
    /// Local storage is authoritative; the remote is a best-effort mirror.
    Hybrid,
    /// The remote server is authoritative; local disk is never touched.
    RemoteOnly,
}

/// The journal facade. Owns the local store, the optional remote client,
/// and the mode that arbitrates between them.
pub struct Journal {
    mode: Mode,
    store: EntryStore,
    remote: Option<RemoteClient>,
    excerpt_length: usize,
}

impl Journal {
    pub fn new(
        config: &QuillConfig,
        store: EntryStore,
    ) -> Result<Self> {
        let remote = RemoteClient::from_config(&config.remote);
        let mode = match (&remote, config.remote.remote_only) {
            (Some(_), true) => Mode::RemoteOnly,
            (Some(_), false) => Mode::Hybrid,
            (None, true) => {
                return Err(JournalError::usage(
                    "remote_only requires server_url, team_id, and api_key",
                ));
            }
            (None, false) => Mode::Local,
        };
        Ok(Self {
            mode,
            store,
            remote,
            excerpt_length: config.search.excerpt_length,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    fn remote(&self) -> &RemoteClient {
        self.remote.as_ref().expect("remote modes carry a client")
    }

    /// Write a free-text entry.
    pub async fn write_free_text(&self, text: &str) -> Result<WriteReceipt> {
        match self.mode {
            Mode::RemoteOnly => {
                if text.trim().is_empty() {
                    return Err(JournalError::usage("entry text must not be empty"));
                }
                let payload = remote::EntryPayload {
                    team_id: self.remote().team_id().to_string(),
                    timestamp: Utc::now().timestamp_millis(),
                    content: Some(text.to_string()),
                    sections: None,
                    embedding: self.soft_embed(text).await,
                };
                self.remote().post_entry(&payload).await?;
                Ok(WriteReceipt { entries: vec![] })
            }
            Mode::Local | Mode::Hybrid => {
                let receipt = self.store.write_free_text(text).await?;
                if self.mode == Mode::Hybrid {
                    let payload = remote::EntryPayload {
                        team_id: self.remote().team_id().to_string(),
                        timestamp: receipt.entries[0].timestamp,
                        content: Some(text.to_string()),
                        sections: None,
                        embedding: mirror_embedding(&receipt),
                    };
                    self.mirror(&payload).await;
                }
                Ok(receipt)
            }
        }
    }

    /// Write a structured entry.
    pub async fn write_sections(&self, sections: &Sections) -> Result<WriteReceipt> {
        match self.mode {
            Mode::RemoteOnly => {
                if sections.is_empty() {
                    return Err(JournalError::usage("at least one section must be provided"));
                }
                let payload = remote::EntryPayload {
                    team_id: self.remote().team_id().to_string(),
                    timestamp: Utc::now().timestamp_millis(),
                    content: None,
                    sections: Some(section_map(sections)),
                    embedding: self
                        .soft_embed(&crate::journal::document::sections_body(
                            &sections.populated(),
                        ))
                        .await,
                };
                self.remote().post_entry(&payload).await?;
                Ok(WriteReceipt { entries: vec![] })
            }
            Mode::Local | Mode::Hybrid => {
                let receipt = self.store.write_sections(sections).await?;
                if self.mode == Mode::Hybrid {
                    let payload = remote::EntryPayload {
                        team_id: self.remote().team_id().to_string(),
                        timestamp: receipt.entries[0].timestamp,
                        content: None,
                        sections: Some(section_map(sections)),
                        embedding: mirror_embedding(&receipt),
                    };
                    self.mirror(&payload).await;
                }
                Ok(receipt)
            }
        }
    }

    /// Semantic search.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        match self.mode {
            Mode::RemoteOnly => {
                let request = remote::SearchRequest {
                    query: query.to_string(),
                    limit: options.limit,
                    similarity_threshold: options.min_score,
                    sections: options.sections.clone(),
                    // Only bounds the caller supplied go on the wire; an
                    // open bound must not turn into an epoch timestamp.
                    date_from: options.date_range.and_then(|r| r.start.map(iso_millis)),
                    date_to: options.date_range.and_then(|r| r.end.map(iso_millis)),
                };
                let response = self.remote().search(&request).await?;
                Ok(response
                    .results
                    .into_iter()
                    .map(|hit| self.hit_to_result(hit, query))
                    .collect())
            }
            Mode::Local | Mode::Hybrid => {
                search::search(&self.store, query, options, self.excerpt_length).await
            }
        }
    }

    /// Recency listing.
    pub async fn list_recent(&self, options: &ListOptions) -> Result<Vec<SearchResult>> {
        match self.mode {
            Mode::RemoteOnly => {
                // The listing endpoint has no date parameters, so a date
                // filter is applied client-side. Pull larger pages and keep
                // paging until the window is satisfied or the listing ends,
                // otherwise older matching entries would be missed.
                let page_size = match options.date_range {
                    Some(_) => options.limit.max(50),
                    None => options.limit,
                };
                let mut matched = Vec::new();
                let mut offset = 0;
                loop {
                    let response = self.remote().list_entries(page_size, offset).await?;
                    let page_len = response.entries.len();
                    matched.extend(response.entries.into_iter().filter(|entry| {
                        options
                            .date_range
                            .map(|r| r.contains(entry.timestamp))
                            .unwrap_or(true)
                    }));
                    offset += page_len;
                    if options.date_range.is_none()
                        || matched.len() >= options.limit
                        || page_len < page_size
                    {
                        break;
                    }
                }
                let mut results: Vec<SearchResult> = matched
                    .into_iter()
                    .map(|entry| {
                        let text = remote_entry_text(entry.content, entry.sections.as_ref());
                        SearchResult {
                            id: entry.id,
                            score: 1.0,
                            excerpt: search::make_excerpt(&text, "", self.excerpt_length),
                            sections: entry
                                .sections
                                .map(|s| s.keys().cloned().collect())
                                .unwrap_or_default(),
                            timestamp: entry.timestamp,
                            text,
                            locality: None,
                            path: None,
                        }
                    })
                    .collect();
                results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                results.truncate(options.limit);
                Ok(results)
            }
            Mode::Local | Mode::Hybrid => {
                search::list_recent(&self.store, options, self.excerpt_length).await
            }
        }
    }

    /// Read one entry by identifier: a `journal://` URI or an absolute path
    /// in local modes, an opaque remote id in remote-only mode. Returns the
    /// raw document text, or `None` when it does not exist.
    pub async fn read_entry(&self, id: &str) -> Result<Option<String>> {
        match self.mode {
            Mode::RemoteOnly => {
                // An opaque remote id never contains a path separator;
                // reject before any network call.
                if id.contains('/') || id.contains('\\') {
                    return Err(JournalError::usage(format!(
                        "invalid remote entry id: {id}"
                    )));
                }
                let entry = self.remote().fetch_entry(id).await?;
                Ok(entry.map(|e| remote_entry_text(e.content, e.sections.as_ref())))
            }
            Mode::Local | Mode::Hybrid => {
                let path = resolve_local_id(id)?;
                self.store.read_entry(&path).await
            }
        }
    }

    /// Regenerate missing vector documents. A no-op in remote-only mode,
    /// where no local files exist.
    pub async fn backfill(&self) -> usize {
        match self.mode {
            Mode::RemoteOnly => 0,
            Mode::Local | Mode::Hybrid => self.store.generate_missing_embeddings().await,
        }
    }

    /// Best-effort mirror: a remote failure in hybrid mode is logged, never
    /// raised — local storage is authoritative.
    async fn mirror(&self, payload: &remote::EntryPayload) {
        if let Err(e) = self.remote().post_entry(payload).await {
            warn!(error = %e, "remote mirror failed, local entry kept");
        }
    }

    /// Embed for a remote payload; failure means the payload simply omits
    /// the embedding.
    async fn soft_embed(&self, text: &str) -> Option<Vec<f32>> {
        match self.store.resolver().embed(text).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(error = %e, "embedding omitted from remote payload");
                None
            }
        }
    }

    fn hit_to_result(&self, hit: remote::SearchHit, query: &str) -> SearchResult {
        let text = remote_entry_text(hit.content, hit.sections.as_ref());
        SearchResult {
            id: hit.id,
            score: hit.similarity_score,
            excerpt: search::make_excerpt(&text, query, self.excerpt_length),
            sections: hit.matched_sections,
            timestamp: hit.timestamp,
            text,
            locality: None,
            path: None,
        }
    }
}

/// Resolve a local identifier — `journal://` URI or raw absolute path — to a
/// storage path, enforcing the path-safety predicate on both shapes.
fn resolve_local_id(id: &str) -> Result<PathBuf> {
    let path = if id.starts_with(&format!("{}://", uri::SCHEME)) {
        let (_, path) = uri::decode(id)?;
        path
    } else {
        PathBuf::from(id)
    };
    let display = path.to_string_lossy();
    if !uri::is_path_safe(&display) {
        return Err(JournalError::usage(format!("unsafe entry path: {display}")));
    }
    Ok(path)
}

fn section_map(sections: &Sections) -> BTreeMap<String, String> {
    sections
        .populated()
        .into_iter()
        .map(|(key, content)| (key.as_str().to_string(), content.to_string()))
        .collect()
}

/// The first derived vector in a receipt, reused for the mirror payload so
/// hybrid writes embed once.
fn mirror_embedding(receipt: &WriteReceipt) -> Option<Vec<f32>> {
    receipt
        .entries
        .iter()
        .find_map(|entry| entry.embedding.clone())
}

fn remote_entry_text(
    content: Option<String>,
    sections: Option<&BTreeMap<String, String>>,
) -> String {
    if let Some(content) = content {
        return content;
    }
    sections
        .map(|map| {
            map.iter()
                .map(|(key, value)| format!("{key}: {value}"))
                .collect::<Vec<_>>()
                .join("\n\n")
        })
        .unwrap_or_default()
}

fn iso_millis(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
