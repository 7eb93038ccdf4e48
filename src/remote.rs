//! HTTP client for the remote journal server.
//!
//! Covers the four remote operations: entry posting, semantic search,
//! recency listing, and single-entry fetch. Every failure is wrapped with a
//! stage prefix so callers can tell which remote operation fell over; the
//! mode layer decides whether that failure is fatal (remote-only) or merely
//! logged (hybrid mirror).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::error::{JournalError, Result};

const API_KEY_HEADER: &str = "X-API-Key";

pub const STAGE_POST: &str = "Remote journal posting failed";
pub const STAGE_SEARCH: &str = "Remote search failed";
pub const STAGE_LIST: &str = "Remote listing failed";
pub const STAGE_FETCH: &str = "Remote fetch failed";

/// Body of `POST /teams/{team}/entries`. Exactly one of `content` and
/// `sections` is populated per call; unset section keys are omitted
/// entirely, never sent as empty markers.
#[derive(Debug, Clone, Serialize)]
pub struct EntryPayload {
    pub team_id: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<BTreeMap<String, String>>,
    /// Included only when derivation succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Body of `POST /teams/{team}/search`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub similarity_threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<String>>,
    /// ISO-8601.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub total_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub similarity_score: f64,
    pub timestamp: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sections: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub matched_sections: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse {
    pub entries: Vec<RemoteEntry>,
    pub total_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteEntry {
    pub id: String,
    pub timestamp: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sections: Option<BTreeMap<String, String>>,
}

/// Client for one team's journal on the remote server.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    team_id: String,
    api_key: String,
}

impl RemoteClient {
    pub fn new(server_url: &str, team_id: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: server_url.trim_end_matches('/').to_string(),
            team_id: team_id.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Build a client from config, or `None` when the config is not fully
    /// populated and active.
    pub fn from_config(config: &RemoteConfig) -> Option<Self> {
        if !config.is_active() {
            return None;
        }
        Some(Self::new(
            config.server_url.as_deref()?,
            config.team_id.as_deref()?,
            config.api_key.as_deref()?,
        ))
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    fn entries_url(&self) -> String {
        format!("{}/teams/{}/entries", self.base_url, self.team_id)
    }

    /// `POST /teams/{team}/entries`.
    pub async fn post_entry(&self, payload: &EntryPayload) -> Result<()> {
        let response = self
            .http
            .post(self.entries_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| JournalError::transport(STAGE_POST, e.to_string()))?;
        expect_success(STAGE_POST, response).await?;
        Ok(())
    }

    /// `POST /teams/{team}/search`.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let url = format!("{}/teams/{}/search", self.base_url, self.team_id);
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| JournalError::transport(STAGE_SEARCH, e.to_string()))?;
        let response = expect_success(STAGE_SEARCH, response).await?;
        response
            .json()
            .await
            .map_err(|e| JournalError::transport(STAGE_SEARCH, e.to_string()))
    }

    /// `GET /teams/{team}/entries?limit=&offset=`.
    pub async fn list_entries(&self, limit: usize, offset: usize) -> Result<ListResponse> {
        let response = self
            .http
            .get(self.entries_url())
            .query(&[("limit", limit), ("offset", offset)])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| JournalError::transport(STAGE_LIST, e.to_string()))?;
        let response = expect_success(STAGE_LIST, response).await?;
        response
            .json()
            .await
            .map_err(|e| JournalError::transport(STAGE_LIST, e.to_string()))
    }

    /// `GET /teams/{team}/entries/{id}`. A 404 is the domain's not-found,
    /// not an error.
    pub async fn fetch_entry(&self, id: &str) -> Result<Option<RemoteEntry>> {
        let url = format!("{}/{id}", self.entries_url());
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| JournalError::transport(STAGE_FETCH, e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_success(STAGE_FETCH, response).await?;
        let entry = response
            .json()
            .await
            .map_err(|e| JournalError::transport(STAGE_FETCH, e.to_string()))?;
        Ok(Some(entry))
    }
}

/// Map a non-2xx response to a transport error carrying status and body.
async fn expect_success(
    stage: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(JournalError::transport(
        stage,
        format!("HTTP {status}: {body}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_omits_unset_fields() {
        let payload = EntryPayload {
            team_id: "team-1".into(),
            timestamp: 1_752_077_133_123,
            content: Some("hello".into()),
            sections: None,
            embedding: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["content"], "hello");
        assert!(json.get("sections").is_none());
        assert!(json.get("embedding").is_none());
    }

    #[test]
    fn search_request_serializes_dates_when_present() {
        let request = SearchRequest {
            query: "q".into(),
            limit: 5,
            similarity_threshold: 0.7,
            sections: None,
            date_from: Some("2025-07-01T00:00:00Z".into()),
            date_to: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["similarity_threshold"], 0.7);
        assert_eq!(json["date_from"], "2025-07-01T00:00:00Z");
        assert!(json.get("date_to").is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = RemoteClient::new("https://j.example.com/", "t", "k");
        assert_eq!(client.entries_url(), "https://j.example.com/teams/t/entries");
    }

    #[test]
    fn from_config_requires_active_config() {
        let config = RemoteConfig {
            server_url: Some("https://j.example.com".into()),
            team_id: Some("t".into()),
            api_key: None,
            enabled: true,
            remote_only: false,
        };
        assert!(RemoteClient::from_config(&config).is_none());
    }
}
