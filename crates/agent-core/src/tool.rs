//! Tool System
//!
//! Extensible tool framework for agent capabilities.
//! Tools are registered at runtime and invoked by the reasoning loop.
//! Local built-ins live here; remote MCP tools implement the same trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::expr;

/// Tool call request from the LLM
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    pub arguments: HashMap<String, serde_json::Value>,

    /// Optional call ID for tracking
    #[serde(default)]
    pub id: Option<String>,
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID (if provided in request)
    pub id: Option<String>,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (success message or error)
    pub output: String,

    /// Structured data (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: false,
            output: error.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,

    /// Whether tool has side effects
    #[serde(default)]
    pub has_side_effects: bool,
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Validate arguments before execution (optional)
    fn validate(&self, call: &ToolCall) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !call.arguments.contains_key(&param.name) {
                return Err(AgentError::ToolValidation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

/// Registry for available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the local built-in tools
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ClockTool);
        registry.register(CalculateTool);
        registry
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let schema = tool.schema();
        self.tools.insert(schema.name.clone(), Arc::new(tool));
    }

    /// Register a boxed tool
    pub fn register_boxed(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        self.tools.insert(schema.name.clone(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        // Validate first
        tool.validate(call)?;

        // Execute
        tool.execute(call).await
    }

    /// Get all tool schemas (for system prompt generation)
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Generate system prompt section describing available tools
    pub fn generate_prompt_section(&self) -> String {
        let mut prompt = String::from("## Available Tools\n\n");
        prompt.push_str("You can use the following tools by responding with a JSON block:\n\n");
        prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");

        for schema in self.schemas() {
            prompt.push_str(&format!("### {}\n", schema.name));
            prompt.push_str(&format!("{}\n", schema.description));

            if !schema.parameters.is_empty() {
                prompt.push_str("**Parameters:**\n");
                for param in &schema.parameters {
                    let required = if param.required { " (required)" } else { "" };
                    prompt.push_str(&format!(
                        "- `{}` ({}){}: {}\n",
                        param.name, param.param_type, required, param.description
                    ));
                }
            }
            prompt.push('\n');
        }

        prompt
    }
}

// ============================================================================
// Built-in Tools
// ============================================================================

/// Clock tool - returns the current local time and date
pub struct ClockTool;

#[async_trait]
impl Tool for ClockTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_current_time".into(),
            description: "Get the current time and date.".into(),
            parameters: vec![],
            category: Some("time".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
        let now = chrono::Local::now();
        Ok(ToolResult::success(
            "get_current_time",
            now.format("%Y-%m-%d %H:%M:%S").to_string(),
        ))
    }
}

/// Calculator tool - evaluates a constrained arithmetic expression
pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "calculate".into(),
            description: format!(
                "Calculate the result of a mathematical expression. \
                 Supports + - * / % ** and the functions: {}.",
                expr::ALLOWED_FUNCTIONS.join(", ")
            ),
            parameters: vec![ParameterSchema {
                name: "expression".into(),
                param_type: "string".into(),
                description: "Mathematical expression to evaluate (e.g., '2 + 2', 'pow(2, 10)')"
                    .into(),
                required: true,
                default: None,
                enum_values: None,
            }],
            category: Some("math".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let expression = call
            .arguments
            .get("expression")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::ToolValidation("Missing expression".into()))?;

        // Rejections are reported back to the model as text, not raised
        match expr::evaluate(expression) {
            Ok(value) => Ok(ToolResult::success(
                "calculate",
                format!("{} = {}", expression, value),
            )),
            Err(e) => Ok(ToolResult::failure(
                "calculate",
                format!("Error calculating {}: {}", expression, e),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[(&str, serde_json::Value)]) -> ToolCall {
        ToolCall {
            name: name.into(),
            arguments: args
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            id: None,
        }
    }

    #[tokio::test]
    async fn test_clock_tool_format() {
        let result = ClockTool.execute(&call("get_current_time", &[])).await.unwrap();
        assert!(result.success);
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(result.output.len(), 19);
        assert_eq!(&result.output[4..5], "-");
        assert_eq!(&result.output[10..11], " ");
        assert_eq!(&result.output[13..14], ":");
    }

    #[tokio::test]
    async fn test_calculate_tool_success() {
        let result = CalculateTool
            .execute(&call("calculate", &[("expression", "2 + 2".into())]))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "2 + 2 = 4");
    }

    #[tokio::test]
    async fn test_calculate_tool_rejection_is_reported() {
        let result = CalculateTool
            .execute(&call("calculate", &[("expression", "shutil(1)".into())]))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("Error calculating shutil(1):"));
    }

    #[tokio::test]
    async fn test_calculate_tool_missing_argument() {
        let err = CalculateTool.execute(&call("calculate", &[])).await;
        assert!(err.is_err());
    }

    #[test]
    fn test_tool_registry() {
        let registry = ToolRegistry::with_builtins();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("get_current_time").is_some());
        assert!(registry.get("calculate").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[tokio::test]
    async fn test_registry_validates_before_execution() {
        let registry = ToolRegistry::with_builtins();
        let result = registry.execute(&call("calculate", &[])).await;
        assert!(matches!(result, Err(AgentError::ToolValidation(_))));
    }

    #[test]
    fn test_prompt_section_lists_tools() {
        let registry = ToolRegistry::with_builtins();
        let prompt = registry.generate_prompt_section();
        assert!(prompt.contains("get_current_time"));
        assert!(prompt.contains("calculate"));
        assert!(prompt.contains("`expression` (string) (required)"));
    }
}
