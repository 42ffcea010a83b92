//! External type checker and linter, run as subprocesses with a timeout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::TypescriptConfig;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("empty command")]
    EmptyCommand,
    #[error("unparseable command line: {0}")]
    BadCommand(String),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {secs} seconds")]
    Timeout { program: String, secs: u64 },
    #[error("async runtime unavailable: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Completed subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// The collaborators the TypeScript validator shells out to.
pub trait ExternalCheck {
    /// Whole-project type check.
    fn type_check(&self) -> Result<CheckOutput, CheckError>;
    /// Lint-and-autofix one file.
    fn lint_fix(&self, file: &Path) -> Result<CheckOutput, CheckError>;
}

/// A configured command line with its time limit.
#[derive(Debug, Clone)]
pub struct CheckCommand {
    pub command_line: String,
    pub timeout: Duration,
}

impl CheckCommand {
    /// Split into argv, substituting `{file}` when a file is given.
    fn argv(&self, file: Option<&Path>) -> Result<Vec<String>, CheckError> {
        let mut words = shlex::split(&self.command_line)
            .ok_or_else(|| CheckError::BadCommand(self.command_line.clone()))?;
        if words.is_empty() {
            return Err(CheckError::EmptyCommand);
        }
        if let Some(file) = file {
            let file = file.to_string_lossy();
            for word in &mut words {
                if word.contains("{file}") {
                    *word = word.replace("{file}", &file);
                }
            }
        }
        Ok(words)
    }
}

/// Runs the configured commands from the project root.
#[derive(Debug, Clone)]
pub struct ProcessChecker {
    project_dir: PathBuf,
    typecheck: CheckCommand,
    lint: CheckCommand,
}

impl ProcessChecker {
    pub fn from_config(config: &TypescriptConfig, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            typecheck: CheckCommand {
                command_line: config.typecheck_command.clone(),
                timeout: Duration::from_secs(config.typecheck_timeout_secs),
            },
            lint: CheckCommand {
                command_line: config.lint_command.clone(),
                timeout: Duration::from_secs(config.lint_timeout_secs),
            },
        }
    }

    fn run(&self, spec: &CheckCommand, file: Option<&Path>) -> Result<CheckOutput, CheckError> {
        let argv = spec.argv(file)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(CheckError::Runtime)?;
        runtime.block_on(run_with_timeout(&argv, &self.project_dir, spec.timeout))
    }
}

impl ExternalCheck for ProcessChecker {
    fn type_check(&self) -> Result<CheckOutput, CheckError> {
        self.run(&self.typecheck, None)
    }

    fn lint_fix(&self, file: &Path) -> Result<CheckOutput, CheckError> {
        self.run(&self.lint, Some(file))
    }
}

async fn run_with_timeout(
    argv: &[String],
    cwd: &Path,
    limit: Duration,
) -> Result<CheckOutput, CheckError> {
    let program = argv[0].clone();
    log::debug!("running {argv:?} in {} (timeout {limit:?})", cwd.display());

    let child = Command::new(&program)
        .args(&argv[1..])
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CheckError::Spawn {
            program: program.clone(),
            source,
        })?;

    // Dropping the future on timeout drops the child, which kills it.
    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| CheckError::Spawn {
            program: program.clone(),
            source,
        })?,
        Err(_) => {
            return Err(CheckError::Timeout {
                program,
                secs: limit.as_secs(),
            });
        }
    };

    log::debug!("{program} exited with {:?}", output.status.code());
    Ok(CheckOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
