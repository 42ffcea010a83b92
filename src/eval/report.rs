//! Human-readable rendering of an [`Evaluation`].
//!
//! Blocking reasons go to stderr (the host shows them to the agent);
//! everything else goes to stdout.

use std::io::{self, Write};

use crate::eval::{Evaluation, Severity, Verdict};

/// Per-hook wording for the rendered report.
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    /// Printed with the subject before evaluation, e.g. "Scanning command:".
    pub checking: &'static str,
    /// Heading on stderr above critical findings.
    pub blocked: &'static str,
    /// Reminder lines printed on stderr after the critical findings.
    pub block_footer: &'static [&'static str],
    /// Heading on stdout above warnings.
    pub warnings: &'static str,
    /// Printed on stdout when the operation goes ahead.
    pub passed: &'static str,
    /// Print `passed` even when warnings were reported.
    pub pass_with_warnings: bool,
}

/// Longest subject echoed on the console (commands can be huge).
const SUBJECT_PREVIEW: usize = 80;

pub fn preview(subject: &str) -> String {
    let mut out: String = subject.chars().take(SUBJECT_PREVIEW).collect();
    if subject.chars().count() > SUBJECT_PREVIEW {
        out.push_str("...");
    }
    out
}

pub fn render_intro(messages: &Messages, subject: &str, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{} {}", messages.checking, preview(subject))
}

fn render_warnings(messages: &Messages, eval: &Evaluation, out: &mut dyn Write) -> io::Result<()> {
    let mut warnings = eval.with_severity(Severity::Warning).peekable();
    if warnings.peek().is_none() {
        return Ok(());
    }
    writeln!(out, "{}", messages.warnings)?;
    for f in warnings {
        writeln!(out, "  • {}", f.message)?;
        if let Some(s) = &f.suggestion {
            writeln!(out, "    suggestion: {s}")?;
        }
    }
    Ok(())
}

/// Write the findings to the appropriate streams.
///
/// Warnings always reach stdout, also ahead of a block report.
pub fn render(
    messages: &Messages,
    eval: &Evaluation,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<()> {
    if eval.verdict() == Verdict::Block {
        render_warnings(messages, eval, out)?;
        writeln!(err, "{}", messages.blocked)?;
        for f in eval.with_severity(Severity::Critical) {
            writeln!(err, "  • {}", f.message)?;
            if let Some(s) = &f.suggestion {
                writeln!(err, "    fix: {s}")?;
            }
            if let Some(d) = &f.detail {
                for line in d.lines() {
                    writeln!(err, "      {line}")?;
                }
            }
        }
        if !messages.block_footer.is_empty() {
            writeln!(err)?;
            for line in messages.block_footer {
                writeln!(err, "{line}")?;
            }
        }
        return Ok(());
    }

    render_warnings(messages, eval, out)?;

    let infos: Vec<_> = eval.with_severity(Severity::Info).collect();
    if !infos.is_empty() {
        writeln!(out, "Information:")?;
        for f in &infos {
            writeln!(out, "  • {}", f.message)?;
            if let Some(s) = &f.suggestion {
                writeln!(out, "    {s}")?;
            }
        }
    }

    if eval.findings.is_empty() || messages.pass_with_warnings {
        writeln!(out, "{}", messages.passed)?;
    }
    for tip in &eval.tips {
        writeln!(out, "Tip: {tip}")?;
    }
    Ok(())
}
