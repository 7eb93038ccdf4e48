use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchJournalParams {
    #[schemars(description = "Natural language search query")]
    pub query: String,

    #[schemars(description = "Maximum number of results. Defaults from config.")]
    pub limit: Option<usize>,

    #[schemars(description = "Minimum similarity score in [-1, 1]. Defaults from config.")]
    pub min_score: Option<f64>,

    #[schemars(
        description = "Only return entries whose section labels match one of these (case-insensitive substring), e.g. [\"feelings\", \"technical\"]"
    )]
    pub sections: Option<Vec<String>>,

    #[schemars(description = "Earliest entry date, ISO-8601 or YYYY-MM-DD")]
    pub date_from: Option<String>,

    #[schemars(description = "Latest entry date, ISO-8601 or YYYY-MM-DD")]
    pub date_to: Option<String>,

    #[schemars(description = "Restrict to one storage scope: 'project' or 'user'. Searches both when omitted.")]
    pub locality: Option<String>,
}
