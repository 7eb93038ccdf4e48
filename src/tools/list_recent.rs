use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListRecentParams {
    #[schemars(description = "Maximum number of entries. Defaults from config.")]
    pub limit: Option<usize>,

    #[schemars(description = "Restrict to one storage scope: 'project' or 'user'. Lists both when omitted.")]
    pub locality: Option<String>,

    #[schemars(description = "Earliest entry date, ISO-8601 or YYYY-MM-DD")]
    pub date_from: Option<String>,

    #[schemars(description = "Latest entry date, ISO-8601 or YYYY-MM-DD")]
    pub date_to: Option<String>,
}
