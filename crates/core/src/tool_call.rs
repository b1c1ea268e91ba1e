//! Tool call events issued by the voice service
//!
//! The conversational model invokes tools mid-session and expects a JSON
//! result within the same turn. Events carry a correlation token so late
//! or discarded resolutions can be matched to their issuing call.

use serde::{Deserialize, Serialize};

/// The closed set of tools exposed to the voice service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    SearchWines,
    GetWine,
    ListWines,
    RecommendWines,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SearchWines => "search_wines",
            ToolName::GetWine => "get_wine",
            ToolName::ListWines => "list_wines",
            ToolName::RecommendWines => "recommend_wines",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "search_wines" => Some(ToolName::SearchWines),
            "get_wine" => Some(ToolName::GetWine),
            "list_wines" => Some(ToolName::ListWines),
            "recommend_wines" => Some(ToolName::RecommendWines),
            _ => None,
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured function invocation from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallEvent {
    /// Correlation token from the voice service.
    pub id: String,
    /// Which tool to invoke.
    pub name: ToolName,
    /// Arguments, validated against the per-tool schema before execution.
    pub arguments: serde_json::Value,
}

impl ToolCallEvent {
    pub fn new(name: ToolName, arguments: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            arguments,
        }
    }
}
