//! Private journal for AI agents — timestamped entries with semantic search,
//! exposed over MCP.
//!
//! Quill stores journal entries as plain markdown files with a sibling
//! vector document per entry, splits writes across two storage scopes
//! (project and user locality), and answers similarity queries by
//! brute-force cosine ranking. An optional remote journal server can act as
//! a best-effort mirror, or — in remote-only mode — as the authoritative
//! store with local disk never touched.
//!
//! # Architecture
//!
//! - **Storage**: day-foldered markdown files with a fixed frontmatter
//!   envelope; pretty-printed JSON `.embedding` siblings, written atomically
//! - **Embeddings**: local ONNX Runtime with all-MiniLM-L6-v2 (384
//!   dimensions), behind an explicitly-stateful resolver
//! - **Search**: brute-force cosine similarity with section and date
//!   filters, plus query-aware excerpting
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment
//!   variables, including the immutable remote settings
//! - [`embedding`] — Text-to-vector pipeline and the lazy provider resolver
//! - [`journal`] — Entry store, retrieval engine, document envelope, and
//!   opaque `journal://` addressing
//! - [`mode`] — The per-operation local/hybrid/remote-only arbitration
//! - [`remote`] — HTTP client for the remote journal server

pub mod config;
pub mod embedding;
pub mod error;
pub mod journal;
pub mod mode;
pub mod remote;
