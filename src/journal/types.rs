//! Core journal type definitions.
//!
//! Defines [`Locality`] (the two storage scopes), [`SectionKey`] (the five
//! structured thought categories and their static locality routing),
//! [`VectorDocument`] (the persisted search vector), and the ephemeral
//! [`SearchResult`] returned from queries.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One of the two independent storage scopes.
///
/// Project entries live under the per-project journal root; user entries
/// live under the home-directory journal root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locality {
    Project,
    User,
}

impl Locality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for Locality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Locality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Self::Project),
            "user" => Ok(Self::User),
            _ => Err(format!("unknown locality: {s}")),
        }
    }
}

/// The five structured section categories a `process_thoughts` write may
/// populate. Each key routes to exactly one locality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Feelings,
    ProjectNotes,
    UserContext,
    TechnicalInsights,
    WorldKnowledge,
}

/// All section keys, in envelope order.
pub const SECTION_KEYS: [SectionKey; 5] = [
    SectionKey::Feelings,
    SectionKey::ProjectNotes,
    SectionKey::UserContext,
    SectionKey::TechnicalInsights,
    SectionKey::WorldKnowledge,
];

impl SectionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feelings => "feelings",
            Self::ProjectNotes => "project_notes",
            Self::UserContext => "user_context",
            Self::TechnicalInsights => "technical_insights",
            Self::WorldKnowledge => "world_knowledge",
        }
    }

    /// Human heading used in the content document (`## User Context`).
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Feelings => "Feelings",
            Self::ProjectNotes => "Project Notes",
            Self::UserContext => "User Context",
            Self::TechnicalInsights => "Technical Insights",
            Self::WorldKnowledge => "World Knowledge",
        }
    }

    /// Static section-key → locality routing table. `project_notes` is the
    /// only project-scoped section; everything else is about the user.
    pub fn locality(&self) -> Locality {
        match self {
            Self::ProjectNotes => Locality::Project,
            _ => Locality::User,
        }
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured write: up to five optional named sections.
#[derive(Debug, Clone, Default)]
pub struct Sections {
    pub feelings: Option<String>,
    pub project_notes: Option<String>,
    pub user_context: Option<String>,
    pub technical_insights: Option<String>,
    pub world_knowledge: Option<String>,
}

impl Sections {
    pub fn get(&self, key: SectionKey) -> Option<&str> {
        match key {
            SectionKey::Feelings => self.feelings.as_deref(),
            SectionKey::ProjectNotes => self.project_notes.as_deref(),
            SectionKey::UserContext => self.user_context.as_deref(),
            SectionKey::TechnicalInsights => self.technical_insights.as_deref(),
            SectionKey::WorldKnowledge => self.world_knowledge.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        SECTION_KEYS.iter().all(|k| self.get(*k).is_none())
    }

    /// Sections present, in envelope order.
    pub fn populated(&self) -> Vec<(SectionKey, &str)> {
        SECTION_KEYS
            .iter()
            .filter_map(|k| self.get(*k).map(|v| (*k, v)))
            .collect()
    }
}

/// The persisted search vector, stored as pretty-printed JSON in a sibling
/// `.embedding` file next to each content document.
///
/// May legitimately be absent (backfill regenerates it lazily); never
/// partially written — the store writes it atomically via tmp + rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDocument {
    pub embedding: Vec<f32>,
    pub text: String,
    pub sections: Vec<String>,
    pub timestamp: i64,
    pub path: String,
}

/// Inclusive timestamp range filter, in epoch milliseconds. An absent bound
/// is open — it must never be materialized as a sentinel timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl DateRange {
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start.map_or(true, |start| timestamp >= start)
            && self.end.map_or(true, |end| timestamp <= end)
    }
}

/// Options for a semantic search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub min_score: f64,
    /// Case-insensitive substring filters against section labels.
    pub sections: Option<Vec<String>>,
    pub date_range: Option<DateRange>,
    /// `None` searches both localities.
    pub locality: Option<Locality>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: 0.0,
            sections: None,
            date_range: None,
            locality: None,
        }
    }
}

/// Options for a recency listing.
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub limit: usize,
    pub date_range: Option<DateRange>,
    pub locality: Option<Locality>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            date_range: None,
            locality: None,
        }
    }
}

/// A single search or listing result. Ephemeral — never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Opaque `journal://` URI for local results, or the remote entry id.
    pub id: String,
    pub score: f64,
    pub text: String,
    pub sections: Vec<String>,
    pub timestamp: i64,
    pub excerpt: String,
    pub locality: Option<Locality>,
    /// Local storage path. `None` for remote results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Result of a write: the documents actually created, one per populated
/// locality. Empty for remote-only writes.
#[derive(Debug, Clone, Serialize)]
pub struct WriteReceipt {
    pub entries: Vec<WrittenEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenEntry {
    pub locality: Locality,
    pub path: PathBuf,
    pub timestamp: i64,
    /// `false` when vector derivation failed and was swallowed.
    pub vector_written: bool,
    /// Derived vector, kept in memory so a hybrid-mode mirror does not
    /// re-embed. Not serialized into tool responses.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}
