//! Tool trait and schema types

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ToolError;

/// Default per-tool execution timeout.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// Tool schema advertised to the voice service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub input_schema: Value,
}

/// Tool execution result delivered back to the model within the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: Value,
}

impl ToolOutput {
    pub fn json(content: Value) -> Self {
        Self { content }
    }
}

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn schema(&self) -> ToolSchema;

    /// Validate arguments against the tool's input schema.
    fn validate(&self, arguments: &Value) -> Result<(), ToolError>;

    /// Execute with already-validated arguments.
    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError>;

    fn timeout_secs(&self) -> u64 {
        DEFAULT_TOOL_TIMEOUT_SECS
    }
}

/// Compile an input schema, panicking only on programmer error (the
/// schemas are static literals defined next to each tool).
pub(crate) fn compile_schema(schema: &Value) -> JSONSchema {
    JSONSchema::compile(schema).unwrap_or_else(|e| panic!("invalid static tool schema: {e}"))
}

/// Run a compiled schema against arguments, folding violations into one
/// message.
pub(crate) fn check_arguments(schema: &JSONSchema, arguments: &Value) -> Result<(), ToolError> {
    if let Err(errors) = schema.validate(arguments) {
        let details: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(ToolError::InvalidInput(details.join("; ")));
    }
    Ok(())
}
