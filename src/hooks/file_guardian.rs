//! Blocks creation of backup copies, duplicates of protected modules and
//! utility files inside the endpoint directory.

use std::path::{Path, PathBuf};

use crate::audit::{AGENT_ACTIONS_LOG, AuditEntry};
use crate::config::Config;
use crate::eval::{Evaluation, Finding, HookError, Messages, Tool, ToolEvent, Verdict};
use crate::hooks::{Hook, naming, resolve};
use crate::memory::{MemoryEntry, MemoryStore};

pub const ACTION_ALLOWED: &str = "CREATE_ALLOWED";
pub const ACTION_BLOCKED: &str = "CREATE_BLOCKED";

/// Protected keys that may never appear in an endpoint file name,
/// whether or not the protected file exists yet.
const ENDPOINT_FORBIDDEN_KEYS: &[&str] = &["logger", "validation"];

static MESSAGES: Messages = Messages {
    checking: "File Guardian checking:",
    blocked: "FILE CREATION BLOCKED:",
    block_footer: &[
        "REMEMBER:",
        "  • Git already tracks file history",
        "  • Use existing utilities from lib/",
        "  • Never duplicate existing code",
    ],
    warnings: "Warnings (operation allowed):",
    passed: "File creation approved!",
    pass_with_warnings: false,
};

pub struct FileGuardian {
    /// Protected key → absolute path of the one true file.
    protected: Vec<(String, PathBuf)>,
    project_dir: PathBuf,
    memory: Option<MemoryStore>,
}

impl FileGuardian {
    pub fn new(config: &Config, project_dir: &Path, memory: Option<MemoryStore>) -> Self {
        let protected = config
            .protected_files
            .paths
            .iter()
            .map(|(key, rel)| (key.clone(), resolve(project_dir, rel)))
            .collect();
        Self {
            protected,
            project_dir: project_dir.to_path_buf(),
            memory,
        }
    }

    fn protected_path(&self, key: &str) -> Option<&Path> {
        self.protected
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, p)| p.as_path())
    }

    /// The protected module this file would duplicate, with its location.
    fn duplicate_of(&self, path: &str, file_name: &str) -> Option<(String, String)> {
        let lower = file_name.to_lowercase();

        if naming::in_endpoint_dir(path) {
            for key in ENDPOINT_FORBIDDEN_KEYS {
                if lower.contains(key) {
                    let original = self
                        .protected_path(key)
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "lib/".to_string());
                    return Some((key.to_string(), original));
                }
            }
        }

        let target = resolve(&self.project_dir, path);
        self.protected
            .iter()
            .find(|(key, original)| {
                lower.contains(key.as_str()) && target != *original && original.exists()
            })
            .map(|(key, original)| (key.clone(), original.display().to_string()))
    }
}

impl Hook for FileGuardian {
    fn name(&self) -> &'static str {
        "file-guardian"
    }

    fn messages(&self) -> &'static Messages {
        &MESSAGES
    }

    fn audit_log(&self) -> &'static str {
        AGENT_ACTIONS_LOG
    }

    fn subject(&self, event: &ToolEvent) -> Option<String> {
        (event.tool == Tool::Write && !event.file_path.is_empty()).then(|| event.file_path.clone())
    }

    fn evaluate(&self, event: &ToolEvent) -> Result<Evaluation, HookError> {
        let path = event.file_path.as_str();
        let name = event.file_name();
        let mut eval = Evaluation::new(path);

        if naming::is_backup_name(name) {
            eval.push(
                Finding::critical(format!("Backup file creation not allowed: {name}"))
                    .suggest("Git handles version control. Never create backup files manually."),
            );
        }

        if let Some((key, original)) = self.duplicate_of(path, name) {
            eval.push(
                Finding::critical(format!("Duplicate file detected. {key} already exists."))
                    .suggest(format!("Use existing file: {original}")),
            );
        }

        for _ in 0..naming::transient_matches(name) {
            eval.push(
                Finding::warning(format!("Creating temporary/test file: {name}"))
                    .suggest("Consider if this file is really needed. Use proper test directories."),
            );
        }

        if naming::is_misplaced_utility(path, name) {
            eval.push(
                Finding::critical(format!("Utility file in API folder: {name}"))
                    .suggest("Utilities belong in lib/utils/. API folder is for endpoints only."),
            );
        }

        Ok(eval)
    }

    fn record(&self, event: &ToolEvent, _eval: &Evaluation, verdict: Verdict) {
        let Some(memory) = &self.memory else {
            return;
        };
        let blocked = verdict == Verdict::Block;
        let action = if blocked { ACTION_BLOCKED } else { ACTION_ALLOWED };
        if let Err(e) = memory.record(MemoryEntry::now(action, &event.file_path, blocked)) {
            log::warn!("file-guardian: memory update failed: {e}");
        }
    }

    fn audit_entry(&self, event: &ToolEvent, eval: &Evaluation, verdict: Verdict) -> AuditEntry {
        let action = if verdict == Verdict::Block {
            ACTION_BLOCKED
        } else {
            ACTION_ALLOWED
        };
        AuditEntry::for_file(self.name(), action, &event.file_path, eval)
    }
}
