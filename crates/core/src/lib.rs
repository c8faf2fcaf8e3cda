// Core functionality for the sandbox MCP server: script metadata,
// execution and update status

pub mod catalog;
pub mod config;
pub mod error;
pub mod exec;
pub mod header;
pub mod policy;
pub mod types;
pub mod update;

pub use catalog::{ProgramCatalog, ScriptCatalog, SourceDir};
pub use config::Config;
pub use error::{CatalogError, ExecError, UpdateStatusError};
pub use exec::{ExecConfig, ExecutionResult, Executor};
pub use header::{CommentStyle, Header, HeaderSections};
pub use policy::HostOnlyPolicy;
pub use types::*;
pub use update::{UpdateStatus, UpdateStatusReader};
