mod helpers;

use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use helpers::{files_with_ext, journal_with, local_config, VocabProvider};
use quill::error::JournalError;
use quill::journal::types::{DateRange, ListOptions, SearchOptions};
use quill::mode::Mode;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Everything the mock server saw, for assertions after the fact.
#[derive(Default)]
struct Recorded {
    api_keys: Vec<String>,
    posts: Vec<Value>,
    searches: Vec<Value>,
    list_queries: Vec<(usize, usize)>,
}

#[derive(Clone)]
struct MockState {
    recorded: Arc<Mutex<Recorded>>,
    fail_posts: bool,
}

fn header_key(headers: &HeaderMap) -> String {
    headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn mock_post_entry(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut recorded = state.recorded.lock().unwrap();
    recorded.api_keys.push(header_key(&headers));
    recorded.posts.push(body);
    if state.fail_posts {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn mock_search(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut recorded = state.recorded.lock().unwrap();
    recorded.api_keys.push(header_key(&headers));
    recorded.searches.push(body);
    Json(json!({
        "results": [
            {
                "id": "entry-1",
                "similarity_score": 0.91,
                "timestamp": 1_752_000_000_000i64,
                "content": "rust ownership notes",
                "matched_sections": ["technical_insights"]
            },
            {
                "id": "entry-2",
                "similarity_score": 0.55,
                "timestamp": 1_751_000_000_000i64,
                "sections": {"feelings": "calm today"}
            }
        ],
        "total_count": 2
    }))
}

/// Fixed listing corpus: 120 entries, newest first, one day apart.
const LIST_BASE_MS: i64 = 1_752_000_000_000;
const DAY_MS: i64 = 86_400_000;
const LIST_TOTAL: usize = 120;

fn list_entry_timestamp(index: usize) -> i64 {
    LIST_BASE_MS - index as i64 * DAY_MS
}

async fn mock_list_entries(
    headers: HeaderMap,
    Query(params): Query<std::collections::HashMap<String, String>>,
    State(state): State<MockState>,
) -> Json<Value> {
    let limit: usize = params["limit"].parse().unwrap();
    let offset: usize = params["offset"].parse().unwrap();
    {
        let mut recorded = state.recorded.lock().unwrap();
        recorded.api_keys.push(header_key(&headers));
        recorded.list_queries.push((limit, offset));
    }
    let entries: Vec<Value> = (offset..(offset + limit).min(LIST_TOTAL))
        .map(|i| {
            json!({
                "id": format!("entry-{i:03}"),
                "timestamp": list_entry_timestamp(i),
                "content": format!("note {i}")
            })
        })
        .collect();
    Json(json!({ "entries": entries, "total_count": LIST_TOTAL }))
}

async fn mock_fetch_entry(Path((_, id)): Path<(String, String)>) -> impl IntoResponse {
    if id == "entry-1" {
        Json(json!({
            "id": "entry-1",
            "timestamp": 1_752_000_000_000i64,
            "content": "a quiet day"
        }))
        .into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Bind an ephemeral port and serve the mock journal API on it.
async fn spawn_mock(fail_posts: bool) -> (String, Arc<Mutex<Recorded>>) {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let state = MockState {
        recorded: Arc::clone(&recorded),
        fail_posts,
    };
    let app = Router::new()
        .route(
            "/teams/{team}/entries",
            post(mock_post_entry).get(mock_list_entries),
        )
        .route("/teams/{team}/entries/{id}", get(mock_fetch_entry))
        .route("/teams/{team}/search", post(mock_search))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), recorded)
}

fn remote_config(
    base_url: &str,
    remote_only: bool,
    project: &TempDir,
    user: &TempDir,
) -> quill::config::QuillConfig {
    let mut config = local_config(project, user);
    config.remote.server_url = Some(base_url.to_string());
    config.remote.team_id = Some("team-1".to_string());
    config.remote.api_key = Some("secret-key".to_string());
    config.remote.enabled = true;
    config.remote.remote_only = remote_only;
    config
}

#[tokio::test]
async fn hybrid_write_mirrors_entry_to_remote() {
    let (base_url, recorded) = spawn_mock(false).await;
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = remote_config(&base_url, false, &project, &user);
    let journal = journal_with(&config, Arc::new(VocabProvider));
    assert_eq!(journal.mode(), Mode::Hybrid);

    let receipt = journal.write_free_text("rust all day").await.unwrap();
    assert_eq!(receipt.entries.len(), 1);
    assert_eq!(files_with_ext(project.path(), "md").len(), 1);

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.api_keys, vec!["secret-key"]);
    assert_eq!(recorded.posts.len(), 1);
    let payload = &recorded.posts[0];
    assert_eq!(payload["team_id"], "team-1");
    assert_eq!(payload["content"], "rust all day");
    assert_eq!(payload["timestamp"], receipt.entries[0].timestamp);
    // The locally derived vector rides along.
    assert!(payload["embedding"].is_array());
    assert!(payload.get("sections").is_none());
}

#[tokio::test]
async fn hybrid_mirror_failure_keeps_local_entry() {
    let (base_url, recorded) = spawn_mock(true).await;
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = remote_config(&base_url, false, &project, &user);
    let journal = journal_with(&config, Arc::new(VocabProvider));

    // The mirror 500s; the write still succeeds and the entry is on disk.
    journal.write_free_text("rust survives").await.unwrap();
    assert_eq!(files_with_ext(project.path(), "md").len(), 1);
    assert_eq!(recorded.lock().unwrap().posts.len(), 1);
}

#[tokio::test]
async fn remote_only_write_posts_without_touching_disk() {
    let (base_url, recorded) = spawn_mock(false).await;
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = remote_config(&base_url, true, &project, &user);
    let journal = journal_with(&config, Arc::new(VocabProvider));
    assert_eq!(journal.mode(), Mode::RemoteOnly);

    let receipt = journal
        .write_sections(&quill::journal::types::Sections {
            feelings: Some("calm".into()),
            project_notes: Some("shipped the deploy".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(receipt.entries.is_empty());
    assert!(files_with_ext(project.path(), "md").is_empty());
    assert!(files_with_ext(user.path(), "md").is_empty());

    let recorded = recorded.lock().unwrap();
    let payload = &recorded.posts[0];
    assert!(payload.get("content").is_none());
    assert_eq!(payload["sections"]["feelings"], "calm");
    assert_eq!(payload["sections"]["project_notes"], "shipped the deploy");
}

#[tokio::test]
async fn remote_only_write_failure_is_raised() {
    let (base_url, _recorded) = spawn_mock(true).await;
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = remote_config(&base_url, true, &project, &user);
    let journal = journal_with(&config, Arc::new(VocabProvider));

    let err = journal.write_free_text("lost words").await.unwrap_err();
    assert!(matches!(err, JournalError::Transport { .. }));
    assert!(err.to_string().contains(quill::remote::STAGE_POST));
    assert!(err.to_string().contains("500"));
    assert!(files_with_ext(project.path(), "md").is_empty());
}

#[tokio::test]
async fn remote_only_search_maps_hits() {
    let (base_url, recorded) = spawn_mock(false).await;
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = remote_config(&base_url, true, &project, &user);
    let journal = journal_with(&config, Arc::new(VocabProvider));

    let options = SearchOptions {
        limit: 5,
        min_score: 0.4,
        ..SearchOptions::default()
    };
    let results = journal.search("rust", &options).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "entry-1");
    assert!((results[0].score - 0.91).abs() < 1e-9);
    assert_eq!(results[0].sections, vec!["technical_insights"]);
    assert!(results[0].excerpt.contains("rust"));
    assert!(results[0].locality.is_none());
    assert_eq!(results[1].text, "feelings: calm today");

    let recorded = recorded.lock().unwrap();
    let request = &recorded.searches[0];
    assert_eq!(request["query"], "rust");
    assert_eq!(request["limit"], 5);
    assert_eq!(request["similarity_threshold"], 0.4);
}

#[tokio::test]
async fn remote_only_list_sorts_newest_first() {
    let (base_url, recorded) = spawn_mock(false).await;
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = remote_config(&base_url, true, &project, &user);
    let journal = journal_with(&config, Arc::new(VocabProvider));

    let results = journal.list_recent(&ListOptions::default()).await.unwrap();
    assert_eq!(results.len(), 10);
    assert_eq!(results[0].id, "entry-000");
    assert_eq!(results[9].id, "entry-009");
    assert!(results.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    assert!((results[0].score - 1.0).abs() < 1e-9);

    // limit and offset travel as query parameters
    assert_eq!(recorded.lock().unwrap().list_queries, vec![(10, 0)]);
}

#[tokio::test]
async fn remote_only_list_pages_until_date_window_is_filled() {
    let (base_url, recorded) = spawn_mock(false).await;
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = remote_config(&base_url, true, &project, &user);
    let journal = journal_with(&config, Arc::new(VocabProvider));

    // The five matching entries sit beyond the first page of any
    // limit-sized fetch; the client must keep paging to find them.
    let options = ListOptions {
        limit: 5,
        date_range: Some(DateRange {
            start: Some(list_entry_timestamp(64)),
            end: Some(list_entry_timestamp(60)),
        }),
        locality: None,
    };
    let results = journal.list_recent(&options).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["entry-060", "entry-061", "entry-062", "entry-063", "entry-064"]
    );

    let queries = recorded.lock().unwrap().list_queries.clone();
    assert_eq!(queries, vec![(50, 0), (50, 50)]);
}

#[tokio::test]
async fn remote_only_search_omits_unset_date_bounds() {
    let (base_url, recorded) = spawn_mock(false).await;
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = remote_config(&base_url, true, &project, &user);
    let journal = journal_with(&config, Arc::new(VocabProvider));

    let options = SearchOptions {
        date_range: Some(DateRange {
            start: Some(1_752_000_000_000),
            end: None,
        }),
        ..SearchOptions::default()
    };
    journal.search("rust", &options).await.unwrap();

    let recorded = recorded.lock().unwrap();
    let request = &recorded.searches[0];
    let date_from = request["date_from"].as_str().unwrap();
    assert!(date_from.starts_with("2025-"), "date_from was {date_from}");
    // the open upper bound never reaches the wire, not even as an epoch
    assert!(request.get("date_to").is_none());
}

#[tokio::test]
async fn remote_only_read_fetches_by_id() {
    let (base_url, _recorded) = spawn_mock(false).await;
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let config = remote_config(&base_url, true, &project, &user);
    let journal = journal_with(&config, Arc::new(VocabProvider));

    let body = journal.read_entry("entry-1").await.unwrap();
    assert_eq!(body.as_deref(), Some("a quiet day"));
    assert_eq!(journal.read_entry("missing-id").await.unwrap(), None);
}
