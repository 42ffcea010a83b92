//! Policy hooks: one [`Hook`] implementation per host-side check.
//!
//! Each hook owns its rule tables and collaborators (built from [`Config`]
//! at construction) and turns one [`ToolEvent`] into an [`Evaluation`].
//! The [`Runner`](crate::eval::Runner) handles everything around that.
//!
//! [`Config`]: crate::config::Config

/// Backup/duplicate naming rules shared by the file guardian and import validator.
pub mod naming;
/// Blocks backup, duplicate and misplaced file creation (Write).
pub mod file_guardian;
/// Checks import specifiers and restricted API hosts in written text.
pub mod import_validator;
/// Checks payment, checkout and webhook files on disk.
pub mod payment_validator;
/// Blocks dangerous or secret-leaking shell commands (Bash).
pub mod secrets_scanner;
/// Convention rules plus external type check and lint for TypeScript files.
pub mod typescript_validator;

use std::path::{Path, PathBuf};

use crate::audit::{AuditEntry, HOOK_EXECUTIONS_LOG};
use crate::eval::{Evaluation, HookError, Messages, ToolEvent, Verdict};

/// Trait for policy hooks.
pub trait Hook {
    /// Identifier used in logs and audit entries (e.g. `file-guardian`).
    fn name(&self) -> &'static str;

    /// Console wording for this hook's reports.
    fn messages(&self) -> &'static Messages;

    /// File name (under `<state_root>/logs/`) receiving this hook's audit entries.
    fn audit_log(&self) -> &'static str {
        HOOK_EXECUTIONS_LOG
    }

    /// The file path or command this event is about, or `None` when the
    /// hook does not apply (the runner then allows silently).
    fn subject(&self, event: &ToolEvent) -> Option<String>;

    /// Evaluate the rules. Only called when [`Hook::subject`] returned `Some`.
    fn evaluate(&self, event: &ToolEvent) -> Result<Evaluation, HookError>;

    /// Best-effort side effect after the verdict is known.
    fn record(&self, _event: &ToolEvent, _eval: &Evaluation, _verdict: Verdict) {}

    /// Audit record for this invocation.
    fn audit_entry(&self, event: &ToolEvent, eval: &Evaluation, verdict: Verdict) -> AuditEntry {
        AuditEntry::for_file(
            self.name(),
            AuditEntry::action_for(verdict),
            &event.file_path,
            eval,
        )
    }
}

/// True when `path` names a file with one of `extensions` (each including the dot).
pub(crate) fn has_extension(path: &str, extensions: &[&str]) -> bool {
    extensions.iter().any(|ext| path.ends_with(ext))
}

/// Absolute form of a host-supplied path: relative paths are taken from
/// the project root.
pub(crate) fn resolve(project_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        project_dir.join(p)
    }
}

/// Read the on-disk content of the file under inspection.
pub(crate) fn read_target(project_dir: &Path, path: &str) -> Result<String, HookError> {
    let full = resolve(project_dir, path);
    std::fs::read_to_string(&full).map_err(|source| HookError::ReadTarget { path: full, source })
}
