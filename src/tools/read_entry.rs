use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReadEntryParams {
    #[schemars(
        description = "Entry identifier: a journal:// URI or absolute path from search results, or the server-side id in remote-only mode"
    )]
    pub id: String,
}
