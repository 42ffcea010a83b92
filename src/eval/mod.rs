pub mod context;
pub mod decision;
pub mod report;

pub use context::{Tool, ToolEvent};
pub use decision::{Evaluation, Finding, Severity, Verdict, exit};
pub use report::Messages;

pub use crate::error::HookError;

use std::io::Write;

use crate::audit::AuditSink;
use crate::hooks::Hook;

/// Drives one invocation: parse → evaluate → report → record → exit code.
///
/// Every failure after the verdict (console writes, audit, memory) is
/// swallowed; only the verdict decides the exit code.
pub struct Runner<'a> {
    audit: &'a dyn AuditSink,
}

impl<'a> Runner<'a> {
    pub fn new(audit: &'a dyn AuditSink) -> Self {
        Self { audit }
    }

    /// Run `hook` over the raw stdin payload and return the exit code.
    pub fn run(
        &self,
        hook: &dyn Hook,
        raw_input: &str,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> i32 {
        let event = match ToolEvent::parse(raw_input) {
            Ok(event) => event,
            Err(e) => {
                log::debug!("{}: ignoring input: {e}", hook.name());
                return exit::ALLOW;
            }
        };

        let Some(subject) = hook.subject(&event) else {
            return exit::ALLOW;
        };
        let messages = hook.messages();
        let _ = report::render_intro(messages, &subject, out);

        let eval = match hook.evaluate(&event) {
            Ok(eval) => eval,
            Err(e) => {
                log::warn!("{}: {e}", hook.name());
                let _ = writeln!(err, "{e}");
                return exit::ERROR;
            }
        };

        let verdict = eval.verdict();
        log::info!(
            "{}: {} {} ({} findings)",
            hook.name(),
            verdict.label(),
            report::preview(&subject),
            eval.findings.len()
        );
        let _ = report::render(messages, &eval, out, err);

        hook.record(&event, &eval, verdict);
        let entry = hook.audit_entry(&event, &eval, verdict);
        if let Err(e) = self.audit.append(&entry) {
            log::warn!("{}: audit append failed: {e}", hook.name());
        }

        verdict.exit_code()
    }
}
