use crate::catalog::{ProgramCatalog, ScriptCatalog};
use crate::exec::{ExecConfig, Executor};
use crate::policy::HostOnlyPolicy;
use crate::update::UpdateStatusReader;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub update: UpdateConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    #[serde(default = "default_tools_dir")]
    pub tools_dir: PathBuf,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_tools_dir() -> PathBuf {
    PathBuf::from("tools")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scripts_dir: default_scripts_dir(),
            tools_dir: default_tools_dir(),
            working_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default = "default_tool_runner")]
    pub tool_runner: Vec<String>,

    #[serde(default = "default_script_extension")]
    pub script_extension: String,

    #[serde(default = "default_tool_extension")]
    pub tool_extension: String,

    /// Seconds before a child is killed; 0 disables the limit
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_tool_runner() -> Vec<String> {
    vec!["go".to_string(), "run".to_string()]
}

fn default_script_extension() -> String {
    "sh".to_string()
}

fn default_tool_extension() -> String {
    "go".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            tool_runner: default_tool_runner(),
            script_extension: default_script_extension(),
            tool_extension: default_tool_extension(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    #[serde(default = "default_update_config_file")]
    pub config_file: PathBuf,
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".update-check/state")
}

fn default_update_config_file() -> PathBuf {
    PathBuf::from(".update-check/config")
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            config_file: default_update_config_file(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Extra host-only script names, added to the built-in set
    #[serde(default)]
    pub host_only: Vec<String>,
}

impl Config {
    /// Load `config_path`, falling back to defaults when it does not exist.
    ///
    /// Relative paths in the file resolve against the file's directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let base_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("Failed to read configuration file")?;
            Self::from_toml(&content)?
        } else {
            tracing::info!("Configuration file not found, using defaults");
            Self::default()
        };

        config.base_dir = base_dir;

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration file")
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn scripts_path(&self) -> PathBuf {
        self.resolve(&self.paths.scripts_dir)
    }

    pub fn tools_path(&self) -> PathBuf {
        self.resolve(&self.paths.tools_dir)
    }

    pub fn host_only_policy(&self) -> HostOnlyPolicy {
        HostOnlyPolicy::default().with_additional(self.policy.host_only.iter().cloned())
    }

    pub fn script_catalog(&self) -> ScriptCatalog {
        ScriptCatalog::new(
            self.scripts_path(),
            self.execution.script_extension.clone(),
            self.host_only_policy(),
        )
    }

    pub fn program_catalog(&self) -> ProgramCatalog {
        ProgramCatalog::new(self.tools_path(), self.execution.tool_extension.clone())
    }

    pub fn exec_config(&self) -> ExecConfig {
        let timeout = match self.execution.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        ExecConfig {
            shell: vec![self.execution.shell.clone()],
            program_runner: self.execution.tool_runner.clone(),
            working_dir: self.paths.working_dir.as_deref().map(|p| self.resolve(p)),
            timeout,
        }
    }

    pub fn executor(&self) -> Executor {
        Executor::new(self.exec_config())
    }

    pub fn update_reader(&self) -> UpdateStatusReader {
        UpdateStatusReader::new(
            self.resolve(&self.update.state_file),
            self.resolve(&self.update.config_file),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("sandbox-mcp.toml")).unwrap();

        assert_eq!(config.scripts_path(), dir.path().join("scripts"));
        assert_eq!(config.tools_path(), dir.path().join("tools"));
        assert_eq!(config.execution.shell, "bash");

        let exec = config.exec_config();
        assert_eq!(exec.timeout, Some(Duration::from_secs(600)));
        assert_eq!(exec.program_runner, vec!["go", "run"]);
        assert!(config.host_only_policy().is_host_only("init-host-env.sh"));
    }

    #[test]
    fn test_load_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sandbox-mcp.toml");
        std::fs::write(
            &path,
            r#"
[paths]
scripts_dir = "/opt/sandbox/scripts"
working_dir = "work"

[execution]
shell = "sh"
timeout_secs = 0

[policy]
host_only = ["prune-volumes.sh"]
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.scripts_path(), PathBuf::from("/opt/sandbox/scripts"));
        assert_eq!(config.tools_path(), dir.path().join("tools"));

        let exec = config.exec_config();
        assert_eq!(exec.shell, vec!["sh"]);
        assert_eq!(exec.timeout, None);
        assert_eq!(exec.working_dir, Some(dir.path().join("work")));

        let policy = config.host_only_policy();
        assert!(policy.is_host_only("prune-volumes.sh"));
        assert!(policy.is_host_only("init-host-env.sh"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml("[execution]\ntimeout_secs = \"soon\"").is_err());
    }
}
