// Script tools: list, describe and run shell scripts

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::render::{render_script_info, render_script_list};
use crate::tools::{
    json_schema_array, json_schema_enum, json_schema_object, json_schema_string, parse_arguments,
    Tool,
};
use anyhow::Result;
use sandbox_core::exec::display_command;
use sandbox_core::{CategoryFilter, Executor, ScriptCatalog};
use serde::Deserialize;
use std::sync::Arc;

/// Tool to list scripts, optionally by category
pub struct ListScriptsTool {
    catalog: Arc<ScriptCatalog>,
}

impl ListScriptsTool {
    pub fn new(catalog: Arc<ScriptCatalog>) -> Self {
        Self { catalog }
    }
}

#[derive(Debug, Deserialize)]
struct ListScriptsArgs {
    #[serde(default)]
    category: Option<String>,
}

#[async_trait::async_trait]
impl Tool for ListScriptsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_scripts".to_string(),
            description: "List available scripts with a one-line summary each. Scripts prefixed with 'test-' are verification scripts; everything else is a utility.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "category": json_schema_enum(
                        &["utility", "test", "all"],
                        "Only list scripts of this category (default: all)"
                    )
                }),
                vec![],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: ListScriptsArgs = parse_arguments("list_scripts", arguments)?;

        let filter = match args.category.as_deref() {
            None => CategoryFilter::All,
            Some(category) => match category.parse::<CategoryFilter>() {
                Ok(filter) => filter,
                Err(e) => return Ok(CallToolResult::error(e)),
            },
        };

        let scripts = self.catalog.list(filter)?;
        Ok(CallToolResult::text(render_script_list(
            &self.catalog,
            &scripts,
            filter,
        )))
    }
}

/// Tool to show the documented usage of one script
pub struct GetScriptInfoTool {
    catalog: Arc<ScriptCatalog>,
}

impl GetScriptInfoTool {
    pub fn new(catalog: Arc<ScriptCatalog>) -> Self {
        Self { catalog }
    }
}

#[derive(Debug, Deserialize)]
struct ScriptNameArgs {
    name: String,
}

#[async_trait::async_trait]
impl Tool for GetScriptInfoTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_script_info".to_string(),
            description: "Show a script's summary, usage, options and whether it must be run on the host OS".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "name": json_schema_string("Script file name, e.g. 'test-secrets.sh'")
                }),
                vec!["name"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: ScriptNameArgs = parse_arguments("get_script_info", arguments)?;
        let info = self.catalog.info(&args.name)?;
        Ok(CallToolResult::text(render_script_info(&info)))
    }
}

/// Tool to run a script inside the sandbox
///
/// Host-only scripts are refused before anything is spawned.
pub struct RunScriptTool {
    catalog: Arc<ScriptCatalog>,
    executor: Arc<Executor>,
}

impl RunScriptTool {
    pub fn new(catalog: Arc<ScriptCatalog>, executor: Arc<Executor>) -> Self {
        Self { catalog, executor }
    }

    fn host_only_refusal(&self, name: &str, args: &[String]) -> CallToolResult {
        let mut parts: Vec<String> = self.executor.config().shell.clone();
        parts.push(self.catalog.dir().root().join(name).display().to_string());
        parts.extend(args.iter().cloned());

        CallToolResult::error(format!(
            "'{}' must be run on the host OS directly.\n\n\
             Run this in a terminal on the host instead:\n  {}\n\n\
             This server runs inside the sandbox without host privileges \
             (no access to the Docker socket), so it cannot execute this script.",
            name,
            display_command(&parts)
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunArgs {
    pub name: String,
    #[serde(default)]
    pub args: Option<Vec<String>>,
}

#[async_trait::async_trait]
impl Tool for RunScriptTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "run_script".to_string(),
            description: "Run a script and return its exit code, stdout and stderr. Scripts that need host privileges are refused with instructions for running them on the host.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "name": json_schema_string("Script file name"),
                    "args": json_schema_array(
                        json_schema_string("Argument"),
                        "Arguments passed to the script"
                    )
                }),
                vec!["name"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let RunArgs { name, args } = parse_arguments("run_script", arguments)?;
        let args = args.unwrap_or_default();

        if self.catalog.is_host_only(&name) {
            tracing::warn!("Refusing to run host-only script {}", name);
            return Ok(self.host_only_refusal(&name, &args));
        }

        // A link inside the directory may point at a host-only script
        let target = self.catalog.dir().resolve(&name)?;
        if let Some(target_name) = target.file_name().and_then(|n| n.to_str()) {
            if self.catalog.is_host_only(target_name) {
                tracing::warn!("Refusing to run {} (links to host-only {})", name, target_name);
                return Ok(self.host_only_refusal(target_name, &args));
            }
        }

        let result = self
            .executor
            .run_script(self.catalog.dir(), &name, &args)
            .await?;
        Ok(CallToolResult::text(result.render()))
    }
}
