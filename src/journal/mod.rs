//! Journal core: entry persistence, retrieval, and opaque addressing.

pub mod document;
pub mod search;
pub mod store;
pub mod types;
pub mod uri;
