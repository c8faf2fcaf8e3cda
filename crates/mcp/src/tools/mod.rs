pub mod programs;
mod registry;
mod render;
pub mod scripts;
pub mod update;

pub use programs::{GetProgramInfoTool, ListProgramsTool, RunProgramTool};
pub use registry::{
    json_schema_array, json_schema_enum, json_schema_object, json_schema_string,
    parse_arguments, Tool, ToolRegistry,
};
pub use scripts::{GetScriptInfoTool, ListScriptsTool, RunScriptTool};
pub use update::UpdateStatusTool;

use sandbox_core::{Config, Executor, ProgramCatalog, ScriptCatalog, UpdateStatusReader};
use std::sync::Arc;

/// Shared collaborators the built-in tools are constructed from
#[derive(Clone)]
pub struct ToolContext {
    pub scripts: Arc<ScriptCatalog>,
    pub programs: Arc<ProgramCatalog>,
    pub executor: Arc<Executor>,
    pub update_reader: Arc<UpdateStatusReader>,
}

impl ToolContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scripts: Arc::new(config.script_catalog()),
            programs: Arc::new(config.program_catalog()),
            executor: Arc::new(config.executor()),
            update_reader: Arc::new(config.update_reader()),
        }
    }
}

/// The seven tools exposed over MCP, in listing order
pub fn builtin_registry(ctx: &ToolContext) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(ListScriptsTool::new(ctx.scripts.clone())));
    registry.register(Arc::new(GetScriptInfoTool::new(ctx.scripts.clone())));
    registry.register(Arc::new(RunScriptTool::new(
        ctx.scripts.clone(),
        ctx.executor.clone(),
    )));
    registry.register(Arc::new(ListProgramsTool::new(ctx.programs.clone())));
    registry.register(Arc::new(GetProgramInfoTool::new(ctx.programs.clone())));
    registry.register(Arc::new(RunProgramTool::new(
        ctx.programs.clone(),
        ctx.executor.clone(),
    )));
    registry.register(Arc::new(UpdateStatusTool::new(ctx.update_reader.clone())));

    registry
}
