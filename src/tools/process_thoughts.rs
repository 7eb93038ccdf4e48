use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ProcessThoughtsParams {
    #[schemars(description = "Private emotional processing — frustrations, excitement, anxiety")]
    pub feelings: Option<String>,

    #[schemars(
        description = "Observations about the current project — decisions, progress, patterns. Stored in the project journal."
    )]
    pub project_notes: Option<String>,

    #[schemars(description = "Insights about the user — preferences, working style, context")]
    pub user_context: Option<String>,

    #[schemars(description = "Technical learnings — approaches that worked, gotchas, patterns")]
    pub technical_insights: Option<String>,

    #[schemars(description = "General facts about the world learned this session")]
    pub world_knowledge: Option<String>,
}
