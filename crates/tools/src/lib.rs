//! Voice tools for the sommelier shop
//!
//! The conversational model invokes these mid-session and expects a JSON
//! result within the same turn. Arguments are validated against per-tool
//! JSON schemas before execution; execution is wrapped in a per-tool
//! timeout.

pub mod registry;
pub mod tool;
pub mod wine_tools;

pub use registry::{ToolExecutor, ToolRegistry};
pub use tool::{Tool, ToolOutput, ToolSchema};
pub use wine_tools::{
    create_wine_registry, GetWineTool, ListWinesTool, RecommendWinesTool, SearchWinesTool,
};

use thiserror::Error;

/// Tool execution errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no result: {0}")]
    NoResult(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("tool {tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },
}

impl From<ToolError> for sommelier_core::Error {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(name) => {
                sommelier_core::Error::Validation(format!("unknown tool: {name}"))
            }
            ToolError::InvalidInput(msg) => sommelier_core::Error::Validation(msg),
            ToolError::NoResult(msg) => sommelier_core::Error::NotFound(msg),
            ToolError::ExecutionFailed(msg) => sommelier_core::Error::Upstream(msg),
            ToolError::Timeout { tool, secs } => {
                sommelier_core::Error::Upstream(format!("tool {tool} timed out after {secs}s"))
            }
        }
    }
}

impl From<sommelier_catalog::CatalogError> for ToolError {
    fn from(err: sommelier_catalog::CatalogError) -> Self {
        use sommelier_catalog::CatalogError;
        match err {
            CatalogError::Validation(msg) => ToolError::InvalidInput(msg),
            CatalogError::NotFound(name) => ToolError::NoResult(name),
            other => ToolError::ExecutionFailed(other.to_string()),
        }
    }
}
