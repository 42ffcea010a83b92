//! Append-only audit trail: one JSON object per line.
//!
//! Appends take an exclusive advisory lock so concurrently running hooks
//! never interleave partial lines.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::eval::{Evaluation, Severity, Verdict};

/// Subdirectory of the state root holding the log files.
pub const LOG_DIR: &str = "logs";
/// Log of file operations blocked or allowed by the file guardian.
pub const AGENT_ACTIONS_LOG: &str = "agent-actions.log";
/// Log of every other hook's executions.
pub const HOOK_EXECUTIONS_LOG: &str = "hook-executions.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub hook: String,
    /// Outcome label, e.g. `blocked` or `CREATE_ALLOWED`.
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub issues_found: usize,
    #[serde(default)]
    pub critical: usize,
    #[serde(default)]
    pub warnings: usize,
}

impl AuditEntry {
    /// Summarize an evaluation of a file.
    pub fn for_file(hook: &str, action: &str, file: &str, eval: &Evaluation) -> Self {
        Self {
            file: Some(file.to_string()),
            ..Self::summary(hook, action, eval)
        }
    }

    /// Summarize an evaluation of a shell command.
    pub fn for_command(hook: &str, action: &str, command: &str, eval: &Evaluation) -> Self {
        Self {
            command: Some(command.to_string()),
            ..Self::summary(hook, action, eval)
        }
    }

    fn summary(hook: &str, action: &str, eval: &Evaluation) -> Self {
        Self {
            timestamp: crate::logging::timestamp_now(),
            hook: hook.to_string(),
            action: action.to_string(),
            file: None,
            command: None,
            reason: eval.first_critical().map(str::to_string),
            issues_found: eval.findings.len(),
            critical: eval.count(Severity::Critical),
            warnings: eval.count(Severity::Warning),
        }
    }

    /// Default action label for a verdict.
    pub fn action_for(verdict: Verdict) -> &'static str {
        match verdict {
            Verdict::Block => "blocked",
            Verdict::Allow | Verdict::Warn => "allowed",
        }
    }
}

/// Destination for audit entries.
pub trait AuditSink {
    /// Append one entry as a single atomic write.
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError>;
}

/// Newline-delimited JSON file.
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<state_root>/logs/<file_name>`.
    pub fn in_state_dir(state_root: &Path, file_name: &str) -> Self {
        Self::new(state_root.join(LOG_DIR).join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every parseable entry back, skipping foreign or torn lines.
    pub fn read_all(&self) -> Result<Vec<AuditEntry>, StoreError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path)(e)),
        };
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(StoreError::io(&self.path))?;
            if let Ok(entry) = serde_json::from_str(&line) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

impl AuditSink for JsonlAuditLog {
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(StoreError::io(dir))?;
        }
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(StoreError::io(&self.path))?;
        file.lock_exclusive().map_err(StoreError::io(&self.path))?;
        let written = file.write_all(line.as_bytes());
        let _ = FileExt::unlock(&file);
        written.map_err(StoreError::io(&self.path))
    }
}

/// Discards every entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn append(&self, _entry: &AuditEntry) -> Result<(), StoreError> {
        Ok(())
    }
}
