use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ProcessFeelingsParams {
    #[schemars(
        description = "Free-form diary entry. Written verbatim to the project journal — a private space to be completely honest."
    )]
    pub diary_entry: String,
}
