//! cc-policygate: PreToolUse hooks for Claude Code.
//!
//! Reads one hook event as JSON on stdin and exits `0` (allow),
//! `1` (internal error, non-blocking) or `2` (block). Findings go to
//! stdout, blocking reasons to stderr.

use std::io::Read;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;

use clap::Parser;

use cc_policygate::checker::ProcessChecker;
use cc_policygate::eval::exit;
use cc_policygate::{HookKind, Workspace, logging, run_hook};

/// Environment variable the host sets to the project root.
const PROJECT_DIR_ENV: &str = "CLAUDE_PROJECT_DIR";

#[derive(Debug, Parser)]
#[command(name = "cc-policygate", version, about)]
struct Cli {
    /// Project root (default: $CLAUDE_PROJECT_DIR, then the working directory)
    #[arg(long, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Hook to run
    #[arg(value_enum)]
    hook: HookKind,
}

fn project_dir(cli: Option<PathBuf>) -> PathBuf {
    cli.or_else(|| std::env::var_os(PROJECT_DIR_ENV).map(PathBuf::from))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn main() {
    let cli = Cli::parse();

    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        std::process::exit(exit::ALLOW);
    }

    let workspace = Workspace::load(project_dir(cli.project_dir));
    logging::init(&workspace.state_root, &workspace.config.settings.log_level);

    let checker = ProcessChecker::from_config(&workspace.config.typescript, &workspace.project_dir);

    let code = catch_unwind(AssertUnwindSafe(|| {
        let mut stdout = std::io::stdout().lock();
        let mut stderr = std::io::stderr().lock();
        run_hook(
            cli.hook,
            &workspace,
            Box::new(checker),
            &input,
            &mut stdout,
            &mut stderr,
        )
    }))
    .unwrap_or_else(|_| {
        log::error!("{:?}: panicked, allowing", cli.hook);
        exit::ALLOW
    });

    std::process::exit(code);
}
