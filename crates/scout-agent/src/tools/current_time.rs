use async_trait::async_trait;

use super::{Tool, ToolResult};

/// Clock capability. No input; returns the current server time.
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Returns the current server time in ISO format."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
        })
    }

    async fn execute(&self, _input: &str) -> ToolResult {
        ToolResult::success(chrono::Utc::now().to_rfc3339())
    }
}
