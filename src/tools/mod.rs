pub mod list_recent;
pub mod process_feelings;
pub mod process_thoughts;
pub mod read_entry;
pub mod search_journal;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use list_recent::ListRecentParams;
use process_feelings::ProcessFeelingsParams;
use process_thoughts::ProcessThoughtsParams;
use read_entry::ReadEntryParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use search_journal::SearchJournalParams;

use crate::config::QuillConfig;
use crate::journal::types::{DateRange, ListOptions, Locality, SearchOptions, Sections};
use crate::mode::Journal;

/// The Quill MCP tool handler. Holds shared state (the journal facade and
/// config) and exposes all MCP tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct QuillTools {
    tool_router: ToolRouter<Self>,
    journal: Arc<Journal>,
    config: Arc<QuillConfig>,
}

#[tool_router]
impl QuillTools {
    pub fn new(journal: Arc<Journal>, config: Arc<QuillConfig>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            journal,
            config,
        }
    }

    /// Record a free-text diary entry.
    #[tool(description = "Write a private free-form diary entry to the project journal. Use this to process feelings honestly, without any performance.")]
    async fn process_feelings(
        &self,
        Parameters(params): Parameters<ProcessFeelingsParams>,
    ) -> Result<String, String> {
        tracing::info!(len = params.diary_entry.len(), "process_feelings called");
        let receipt = self
            .journal
            .write_free_text(&params.diary_entry)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&receipt).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Record structured thoughts across up to five categories.
    #[tool(description = "Write structured journal thoughts. Categories: feelings, project_notes, user_context, technical_insights, world_knowledge. Each is optional; project_notes goes to the project journal, everything else to the user journal.")]
    async fn process_thoughts(
        &self,
        Parameters(params): Parameters<ProcessThoughtsParams>,
    ) -> Result<String, String> {
        let sections = Sections {
            feelings: params.feelings,
            project_notes: params.project_notes,
            user_context: params.user_context,
            technical_insights: params.technical_insights,
            world_knowledge: params.world_knowledge,
        };
        tracing::info!(
            populated = sections.populated().len(),
            "process_thoughts called"
        );
        let receipt = self
            .journal
            .write_sections(&sections)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&receipt).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Semantic search over journal entries.
    #[tool(description = "Search journal entries by meaning. Returns ranked results with similarity scores and excerpts.")]
    async fn search_journal(
        &self,
        Parameters(params): Parameters<SearchJournalParams>,
    ) -> Result<String, String> {
        let options = SearchOptions {
            limit: params.limit.unwrap_or(self.config.search.default_limit),
            min_score: params
                .min_score
                .unwrap_or(self.config.search.default_min_score),
            sections: params.sections,
            date_range: parse_date_range(params.date_from.as_deref(), params.date_to.as_deref())?,
            locality: parse_locality(params.locality.as_deref())?,
        };
        tracing::info!(query = %params.query, limit = options.limit, "search_journal called");
        let results = self
            .journal
            .search(&params.query, &options)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&results).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Read a single entry by identifier.
    #[tool(description = "Read one journal entry by its id (journal:// URI or path from search results).")]
    async fn read_journal_entry(
        &self,
        Parameters(params): Parameters<ReadEntryParams>,
    ) -> Result<String, String> {
        tracing::info!(id = %params.id, "read_journal_entry called");
        let content = self
            .journal
            .read_entry(&params.id)
            .await
            .map_err(|e| e.to_string())?;
        match content {
            Some(content) => Ok(serde_json::json!({ "found": true, "content": content }).to_string()),
            None => Ok(serde_json::json!({ "found": false }).to_string()),
        }
    }

    /// List the most recent entries.
    #[tool(description = "List recent journal entries, newest first, without semantic ranking.")]
    async fn list_recent_entries(
        &self,
        Parameters(params): Parameters<ListRecentParams>,
    ) -> Result<String, String> {
        let options = ListOptions {
            limit: params.limit.unwrap_or(self.config.search.default_limit),
            date_range: parse_date_range(params.date_from.as_deref(), params.date_to.as_deref())?,
            locality: parse_locality(params.locality.as_deref())?,
        };
        tracing::info!(limit = options.limit, "list_recent_entries called");
        let results = self
            .journal
            .list_recent(&options)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&results).map_err(|e| format!("serialization failed: {e}"))
    }
}

fn parse_locality(raw: Option<&str>) -> Result<Option<Locality>, String> {
    raw.map(|s| s.parse::<Locality>()).transpose()
}

/// Build an inclusive millisecond range from optional ISO-8601 or
/// `YYYY-MM-DD` bounds. A bare date covers its whole day; a bound the
/// caller did not supply stays open rather than becoming a sentinel value.
fn parse_date_range(from: Option<&str>, to: Option<&str>) -> Result<Option<DateRange>, String> {
    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    let start = from.map(|raw| parse_bound(raw, false)).transpose()?;
    let end = to.map(|raw| parse_bound(raw, true)).transpose()?;
    Ok(Some(DateRange { start, end }))
}

fn parse_bound(raw: &str, end_of_day: bool) -> Result<i64, String> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Ok(datetime.with_timezone(&Utc).timestamp_millis());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("invalid date: {raw} (expected ISO-8601 or YYYY-MM-DD)"))?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999).expect("valid time")
    } else {
        date.and_hms_opt(0, 0, 0).expect("valid time")
    };
    Ok(time.and_utc().timestamp_millis())
}

#[tool_handler]
impl ServerHandler for QuillTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Quill is a private journal. Use process_thoughts to record structured \
                 observations, process_feelings for free-form diary entries, \
                 search_journal to find past entries by meaning, and \
                 read_journal_entry / list_recent_entries to browse."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_range_accepts_bare_dates() {
        let range = parse_date_range(Some("2025-07-01"), Some("2025-07-09"))
            .unwrap()
            .unwrap();
        let (start, end) = (range.start.unwrap(), range.end.unwrap());
        assert!(start < end);
        // end covers the whole final day
        assert_eq!((end - start) % 1000, 999);
    }

    #[test]
    fn date_range_accepts_rfc3339() {
        let range = parse_date_range(Some("2025-07-01T12:00:00Z"), None)
            .unwrap()
            .unwrap();
        // the unsupplied bound stays open
        assert_eq!(range.end, None);
        assert!(range.start.unwrap() > 0);
    }

    #[test]
    fn date_range_rejects_garbage() {
        assert!(parse_date_range(Some("next tuesday"), None).is_err());
    }

    #[test]
    fn locality_parse_rejects_unknown() {
        assert_eq!(parse_locality(None).unwrap(), None);
        assert_eq!(
            parse_locality(Some("project")).unwrap(),
            Some(Locality::Project)
        );
        assert!(parse_locality(Some("global")).is_err());
    }
}
