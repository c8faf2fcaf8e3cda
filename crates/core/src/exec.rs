// Child-process execution for scripts and helper programs

use crate::catalog::SourceDir;
use crate::error::ExecError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

/// How scripts and programs are launched
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Interpreter for scripts, e.g. `["bash"]`
    pub shell: Vec<String>,
    /// Build-and-run command for programs, e.g. `["go", "run"]`
    pub program_runner: Vec<String>,
    /// Working directory for children; inherits the server's when unset
    pub working_dir: Option<PathBuf>,
    /// Upper bound on a child's lifetime; unbounded when unset
    pub timeout: Option<Duration>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            shell: vec!["bash".to_string()],
            program_runner: vec!["go".to_string(), "run".to_string()],
            working_dir: None,
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// Captured outcome of one child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Combine command, exit status and both streams into one text block.
    pub fn render(&self) -> String {
        let exit = match self.exit_code {
            Some(code) => code.to_string(),
            None => "none (terminated by signal)".to_string(),
        };

        let mut out = format!(
            "$ {}\nExit code: {}\nDuration: {:.2}s\n\n--- stdout ---\n",
            self.command,
            exit,
            self.duration.as_secs_f64()
        );

        if self.stdout.trim().is_empty() {
            out.push_str("(no output)\n");
        } else {
            out.push_str(self.stdout.trim_end());
            out.push('\n');
        }

        if !self.stderr.trim().is_empty() {
            out.push_str("--- stderr ---\n");
            out.push_str(self.stderr.trim_end());
            out.push('\n');
        }

        out
    }
}

/// Runs scripts through the shell and programs through their runner
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecConfig,
}

impl Executor {
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Run script `name` from `dir` with `args`.
    pub async fn run_script(
        &self,
        dir: &SourceDir,
        name: &str,
        args: &[String],
    ) -> Result<ExecutionResult, ExecError> {
        let path = dir.resolve(name)?;
        if self.config.shell.is_empty() {
            return Err(ExecError::NoRunner("scripts"));
        }
        self.run(&self.config.shell, &path, args).await
    }

    /// Run program `name` from `dir` with `args`.
    pub async fn run_program(
        &self,
        dir: &SourceDir,
        name: &str,
        args: &[String],
    ) -> Result<ExecutionResult, ExecError> {
        let path = dir.resolve(name)?;
        if self.config.program_runner.is_empty() {
            return Err(ExecError::NoRunner("programs"));
        }
        self.run(&self.config.program_runner, &path, args).await
    }

    async fn run(
        &self,
        runner: &[String],
        target: &Path,
        args: &[String],
    ) -> Result<ExecutionResult, ExecError> {
        let mut parts: Vec<String> = runner.to_vec();
        parts.push(target.to_string_lossy().into_owned());
        parts.extend(args.iter().cloned());
        let command_line = display_command(&parts);

        let mut command = Command::new(&parts[0]);
        command
            .args(&parts[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        tracing::debug!("Running {}", command_line);
        let start = Instant::now();

        let output = match self.config.timeout {
            Some(limit) => match timeout(limit, command.output()).await {
                Ok(output) => output,
                Err(_) => {
                    tracing::warn!("{} timed out after {:?}", command_line, limit);
                    return Err(ExecError::Timeout {
                        command: command_line,
                        timeout: limit,
                    });
                }
            },
            None => command.output().await,
        };

        let output = output.map_err(|source| ExecError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let result = ExecutionResult {
            command: command_line,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            duration: start.elapsed(),
        };

        tracing::info!(
            "{} exited with {:?} in {:?}",
            result.command,
            result.exit_code,
            result.duration
        );

        Ok(result)
    }
}

/// Join arguments into a copy-pasteable shell command line.
pub fn display_command<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|part| shell_quote(part.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(part: &str) -> String {
    let plain = !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        part.to_string()
    } else {
        format!("'{}'", part.replace('\'', r"'\''"))
    }
}
