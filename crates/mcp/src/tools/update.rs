// Update status tool: report what the upstream update checker last recorded

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, Tool};
use anyhow::Result;
use chrono::Utc;
use sandbox_core::UpdateStatusReader;
use std::sync::Arc;

/// Tool to report the update checker's persisted state
///
/// Read-only: never contacts the upstream repository.
pub struct UpdateStatusTool {
    reader: Arc<UpdateStatusReader>,
}

impl UpdateStatusTool {
    pub fn new(reader: Arc<UpdateStatusReader>) -> Self {
        Self { reader }
    }
}

#[async_trait::async_trait]
impl Tool for UpdateStatusTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_update_status".to_string(),
            description: "Show when upstream updates were last checked, the last version notified, and the checker's repository, channel and interval. Does not perform a check.".to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        let status = self.reader.read()?;
        Ok(CallToolResult::text(status.render(Utc::now())))
    }
}
