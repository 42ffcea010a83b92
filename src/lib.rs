//! cc-policygate: PreToolUse hooks for Claude Code enforcing project policy.
//!
//! Each hook reads one tool-call event (JSON on stdin), evaluates it against
//! rules built from configuration and answers with an exit code: `0` allow,
//! `1` internal error (non-blocking), `2` block. Findings are printed for
//! the agent to read, and every evaluated call is appended to a JSON-lines
//! audit log.
//!
//! # Architecture
//!
//! - **[`eval`]** — Event parsing, findings and verdicts, console reports, the [`Runner`](eval::Runner).
//! - **[`hooks`]** — One [`Hook`](hooks::Hook) per policy: file guardian, imports, payments, shell, TypeScript.
//! - **[`config`]** — Embedded defaults plus the project overlay at `.claude/policygate.toml`.
//! - **[`audit`]** / **[`memory`]** — Locked JSON-lines audit logs and the bounded operation memory.
//! - **[`checker`]** — External type check and lint commands, run with timeouts.
//! - **[`logging`]** — Diagnostic log under `<state_root>/logs/`.

/// Audit records and the JSON-lines sinks that persist them.
pub mod audit;
/// External type-check and lint commands.
pub mod checker;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Error types for hook evaluation and persisted state.
pub mod error;
/// Evaluation engine: event parsing, verdicts, reports, runner.
pub mod eval;
/// Policy hook implementations.
pub mod hooks;
/// File-based diagnostic logging.
pub mod logging;
/// Bounded memory of recent file operations.
pub mod memory;

use std::io::Write;
use std::path::PathBuf;

use audit::JsonlAuditLog;
use checker::ExternalCheck;
use config::Config;
use eval::Runner;
use hooks::Hook;
use hooks::file_guardian::FileGuardian;
use hooks::import_validator::ImportValidator;
use hooks::payment_validator::PaymentValidator;
use hooks::secrets_scanner::SecretsScanner;
use hooks::typescript_validator::TypescriptValidator;
use memory::MemoryStore;

/// The hook to run, as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HookKind {
    FileGuardian,
    ImportValidator,
    PaymentValidator,
    SecretsScanner,
    TypescriptValidator,
}

/// Project root, its resolved configuration and where state is written.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub project_dir: PathBuf,
    pub config: Config,
    pub state_root: PathBuf,
}

impl Workspace {
    /// Load configuration for `project_dir` (defaults plus overlay).
    pub fn load(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let config = Config::load(&project_dir);
        Self::with_config(project_dir, config)
    }

    pub fn with_config(project_dir: impl Into<PathBuf>, config: Config) -> Self {
        let project_dir = project_dir.into();
        let state_root = config.state_root(&project_dir);
        Self {
            project_dir,
            config,
            state_root,
        }
    }

    fn build(&self, kind: HookKind, checker: Box<dyn ExternalCheck>) -> Box<dyn Hook> {
        let config = &self.config;
        let dir = self.project_dir.as_path();
        match kind {
            HookKind::FileGuardian => {
                let memory =
                    MemoryStore::in_state_dir(&self.state_root, config.settings.memory_capacity);
                Box::new(FileGuardian::new(config, dir, Some(memory)))
            }
            HookKind::ImportValidator => Box::new(ImportValidator::new(config)),
            HookKind::PaymentValidator => Box::new(PaymentValidator::new(config, dir)),
            HookKind::SecretsScanner => Box::new(SecretsScanner::new(config)),
            HookKind::TypescriptValidator => Box::new(TypescriptValidator::new(dir, checker)),
        }
    }
}

/// Run one hook over a raw stdin payload and return the process exit code.
///
/// `checker` is only consulted by the TypeScript validator.
pub fn run_hook(
    kind: HookKind,
    workspace: &Workspace,
    checker: Box<dyn ExternalCheck>,
    raw_input: &str,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> i32 {
    let hook = workspace.build(kind, checker);
    let audit = JsonlAuditLog::in_state_dir(&workspace.state_root, hook.audit_log());
    Runner::new(&audit).run(hook.as_ref(), raw_input, out, err)
}
