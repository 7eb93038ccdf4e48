//! Local retrieval — brute-force vector search, recency listing, excerpts.
//!
//! Every query loads the vector documents from the selected locality roots,
//! filters, scores with cosine similarity, ranks, and excerpts. There is no
//! index; corpora here are journal-sized and a linear scan is the honest
//! cost model.

use std::path::Path;

use tracing::warn;

use crate::error::{JournalError, Result};
use crate::journal::store::{is_day_key, EntryStore, VECTOR_EXT};
use crate::journal::types::{
    ListOptions, Locality, SearchOptions, SearchResult, VectorDocument,
};
use crate::journal::uri;

/// Cosine similarity `dot(a,b) / (|a| * |b|)`.
///
/// Mismatched lengths are a usage error. A zero-magnitude operand yields
/// exactly `0.0`, never NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(JournalError::usage(format!(
            "vector length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Pick the `max_len`-character window of `text` that covers the most
/// distinct query terms, ellipsizing whichever ends it cuts off.
///
/// The window slides in fixed steps of half its length; ties keep the
/// earliest window because only a strictly better score replaces the
/// running best. An empty query returns the head of the text.
pub fn make_excerpt(text: &str, query: &str, max_len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_len {
        return text.to_string();
    }

    let terms: Vec<String> = {
        let mut seen = std::collections::HashSet::new();
        query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .filter(|t| seen.insert(t.clone()))
            .collect()
    };

    if terms.is_empty() {
        let head: String = chars[..max_len].iter().collect();
        return format!("{head}...");
    }

    let step = (max_len / 2).max(1);
    let mut best_start = 0;
    let mut best_score = 0;
    let mut start = 0;
    while start < chars.len() {
        let end = (start + max_len).min(chars.len());
        let window: String = chars[start..end].iter().collect::<String>().to_lowercase();
        let score = terms.iter().filter(|t| window.contains(t.as_str())).count();
        if score > best_score {
            best_score = score;
            best_start = start;
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    let end = (best_start + max_len).min(chars.len());
    let body: String = chars[best_start..end].iter().collect();
    let prefix = if best_start > 0 { "..." } else { "" };
    let suffix = if end < chars.len() { "..." } else { "" };
    format!("{prefix}{body}{suffix}")
}

/// Brute-force semantic search over the local vector documents.
pub async fn search(
    store: &EntryStore,
    query: &str,
    options: &SearchOptions,
    excerpt_len: usize,
) -> Result<Vec<SearchResult>> {
    // Hard failure: deriving the query vector is the sole purpose here.
    let query_vector = store.resolver().embed(query).await?;

    let candidates = load_vectors(store, options.locality).await;

    let mut scored: Vec<SearchResult> = Vec::new();
    for (locality, doc) in &candidates {
        if !passes_filters(doc, options.sections.as_deref(), options.date_range.as_ref()) {
            continue;
        }
        let score = match cosine_similarity(&query_vector, &doc.embedding) {
            Ok(score) => score,
            Err(e) => {
                // Dimension drift (e.g. model change without backfill); skip.
                warn!(path = %doc.path, error = %e, "skipping incomparable vector");
                continue;
            }
        };
        if score < options.min_score {
            continue;
        }
        scored.push(to_result(doc, *locality, score, query, excerpt_len));
    }

    // Stable sort: ties keep original enumeration order.
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(options.limit);
    Ok(scored)
}

/// Recency listing — same loading and filtering as search, minus the query
/// vector. Every result carries a fixed score of 1.0 because a plain
/// listing has no ranking signal.
pub async fn list_recent(
    store: &EntryStore,
    options: &ListOptions,
    excerpt_len: usize,
) -> Result<Vec<SearchResult>> {
    let candidates = load_vectors(store, options.locality).await;

    let mut results: Vec<SearchResult> = candidates
        .iter()
        .filter(|(_, doc)| passes_filters(doc, None, options.date_range.as_ref()))
        .map(|(locality, doc)| to_result(doc, *locality, 1.0, "", excerpt_len))
        .collect();

    results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    results.truncate(options.limit);
    Ok(results)
}

fn passes_filters(
    doc: &VectorDocument,
    sections: Option<&[String]>,
    date_range: Option<&crate::journal::types::DateRange>,
) -> bool {
    if let Some(wanted) = sections {
        let matched = wanted.iter().any(|want| {
            let want = want.to_lowercase();
            doc.sections
                .iter()
                .any(|label| label.to_lowercase().contains(&want))
        });
        if !matched {
            return false;
        }
    }
    if let Some(range) = date_range {
        if !range.contains(doc.timestamp) {
            return false;
        }
    }
    true
}

fn to_result(
    doc: &VectorDocument,
    locality: Locality,
    score: f64,
    query: &str,
    excerpt_len: usize,
) -> SearchResult {
    let path = Path::new(&doc.path);
    SearchResult {
        id: uri::encode(path, locality),
        score,
        text: doc.text.clone(),
        sections: doc.sections.clone(),
        timestamp: doc.timestamp,
        excerpt: make_excerpt(&doc.text, query, excerpt_len),
        locality: Some(locality),
        path: Some(path.to_path_buf()),
    }
}

/// Load every vector document from the selected locality roots. A missing
/// root yields zero records; individual corrupt or unreadable documents are
/// skipped with a warning, never aborting the query.
async fn load_vectors(
    store: &EntryStore,
    locality: Option<Locality>,
) -> Vec<(Locality, VectorDocument)> {
    let localities: &[Locality] = match locality {
        Some(Locality::Project) => &[Locality::Project],
        Some(Locality::User) => &[Locality::User],
        None => &[Locality::Project, Locality::User],
    };

    let mut docs = Vec::new();
    for &locality in localities {
        let root = store.root(locality);
        let mut day_dirs = match tokio::fs::read_dir(root).await {
            Ok(rd) => rd,
            Err(_) => continue, // missing root is not an error
        };
        while let Ok(Some(day)) = day_dirs.next_entry().await {
            let Some(name) = day.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !is_day_key(&name) {
                continue;
            }
            let mut files = match tokio::fs::read_dir(day.path()).await {
                Ok(rd) => rd,
                Err(e) => {
                    warn!(dir = %day.path().display(), error = %e, "skipping unreadable day folder");
                    continue;
                }
            };
            while let Ok(Some(file)) = files.next_entry().await {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some(VECTOR_EXT) {
                    continue;
                }
                match read_vector_document(&path).await {
                    Ok(doc) => docs.push((locality, doc)),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping corrupt vector document");
                    }
                }
            }
        }
    }
    docs
}

async fn read_vector_document(path: &Path) -> Result<VectorDocument> {
    let raw = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_self_similarity_is_one() {
        let v = vec![0.3, -0.5, 0.8];
        assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_opposite_is_minus_one() {
        let v = vec![1.0, 2.0, 3.0];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        assert!((cosine_similarity(&v, &neg).unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_zero_vector_is_exactly_zero() {
        let zero = vec![0.0f32; 4];
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(cosine_similarity(&zero, &v).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&v, &zero).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero).unwrap(), 0.0);
    }

    #[test]
    fn cosine_length_mismatch_is_usage_error() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, JournalError::Usage(_)));
    }

    #[test]
    fn cosine_orthogonal_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).unwrap().abs() < 1e-9);
    }

    #[test]
    fn excerpt_short_text_returned_whole() {
        assert_eq!(make_excerpt("short note", "note", 100), "short note");
    }

    #[test]
    fn excerpt_empty_query_takes_head() {
        let text = "a".repeat(50);
        let excerpt = make_excerpt(&text, "", 10);
        assert_eq!(excerpt, format!("{}...", "a".repeat(10)));
    }

    #[test]
    fn excerpt_finds_matching_window() {
        let filler = "x".repeat(200);
        let text = format!("{filler} the database migration went smoothly today");
        let excerpt = make_excerpt(&text, "database migration", 60);
        assert!(excerpt.contains("database"), "excerpt was: {excerpt}");
        assert!(excerpt.starts_with("..."));
    }

    #[test]
    fn excerpt_ties_favor_earliest_window() {
        // Term appears twice; the first window containing it must win.
        let text = format!("keyword {} keyword {}", "a".repeat(100), "b".repeat(100));
        let excerpt = make_excerpt(&text, "keyword", 30);
        assert!(excerpt.starts_with("keyword"));
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn excerpt_handles_multibyte_text() {
        let text = "émotions ".repeat(40);
        let excerpt = make_excerpt(&text, "émotions", 20);
        assert!(excerpt.contains("émotions"));
    }

    #[test]
    fn section_filter_is_case_insensitive_substring() {
        let doc = VectorDocument {
            embedding: vec![1.0],
            text: "t".into(),
            sections: vec!["Technical Insights".into()],
            timestamp: 0,
            path: "/tmp/x.md".into(),
        };
        assert!(passes_filters(&doc, Some(&["technical".into()]), None));
        assert!(passes_filters(&doc, Some(&["INSIGHT".into()]), None));
        assert!(!passes_filters(&doc, Some(&["feelings".into()]), None));
        // no filter keeps everything
        assert!(passes_filters(&doc, None, None));
    }
}
