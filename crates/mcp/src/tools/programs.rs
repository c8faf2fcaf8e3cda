// Helper program tools: list, describe and run single-file programs

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::render::{render_program_info, render_program_list};
use crate::tools::scripts::RunArgs;
use crate::tools::{
    json_schema_array, json_schema_object, json_schema_string, parse_arguments, Tool,
};
use anyhow::Result;
use sandbox_core::{Executor, ProgramCatalog};
use serde::Deserialize;
use std::sync::Arc;

/// Tool to list helper programs
pub struct ListProgramsTool {
    catalog: Arc<ProgramCatalog>,
}

impl ListProgramsTool {
    pub fn new(catalog: Arc<ProgramCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait::async_trait]
impl Tool for ListProgramsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_tools".to_string(),
            description: "List helper programs in the tools directory with a one-line summary each".to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        let programs = self.catalog.list()?;
        Ok(CallToolResult::text(render_program_list(
            self.catalog.dir().root(),
            &programs,
        )))
    }
}

/// Tool to show the documented usage of one helper program
pub struct GetProgramInfoTool {
    catalog: Arc<ProgramCatalog>,
}

impl GetProgramInfoTool {
    pub fn new(catalog: Arc<ProgramCatalog>) -> Self {
        Self { catalog }
    }
}

#[derive(Debug, Deserialize)]
struct ProgramNameArgs {
    name: String,
}

#[async_trait::async_trait]
impl Tool for GetProgramInfoTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_tool_info".to_string(),
            description: "Show a helper program's summary, usage and options".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "name": json_schema_string("Program file name, e.g. 'merge-settings.go'")
                }),
                vec!["name"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: ProgramNameArgs = parse_arguments("get_tool_info", arguments)?;
        let info = self.catalog.info(&args.name)?;
        Ok(CallToolResult::text(render_program_info(&info)))
    }
}

/// Tool to build and run a helper program
pub struct RunProgramTool {
    catalog: Arc<ProgramCatalog>,
    executor: Arc<Executor>,
}

impl RunProgramTool {
    pub fn new(catalog: Arc<ProgramCatalog>, executor: Arc<Executor>) -> Self {
        Self { catalog, executor }
    }
}

#[async_trait::async_trait]
impl Tool for RunProgramTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "run_tool".to_string(),
            description: "Build and run a helper program and return its exit code, stdout and stderr".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "name": json_schema_string("Program file name"),
                    "args": json_schema_array(
                        json_schema_string("Argument"),
                        "Arguments passed to the program"
                    )
                }),
                vec!["name"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let RunArgs { name, args } = parse_arguments("run_tool", arguments)?;
        let result = self
            .executor
            .run_program(self.catalog.dir(), &name, &args.unwrap_or_default())
            .await?;
        Ok(CallToolResult::text(result.render()))
    }
}
