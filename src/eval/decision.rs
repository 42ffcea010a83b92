/// How serious a single finding is. Ordered so the worst finding wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Terminal state of one hook invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verdict {
    Allow,
    Warn,
    Block,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Allow => "allowed",
            Verdict::Warn => "warned",
            Verdict::Block => "blocked",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Allow => "ALLOW",
            Verdict::Warn => "WARN",
            Verdict::Block => "BLOCK",
        }
    }

    /// Process exit status understood by the host runtime.
    pub fn exit_code(self) -> i32 {
        match self {
            Verdict::Allow | Verdict::Warn => exit::ALLOW,
            Verdict::Block => exit::BLOCK,
        }
    }
}

/// Exit statuses the host runtime interprets.
pub mod exit {
    /// Proceed with the operation.
    pub const ALLOW: i32 = 0;
    /// Hook-internal failure; the host does not block on it.
    pub const ERROR: i32 = 1;
    /// Refuse the operation; stderr is shown as the reason.
    pub const BLOCK: i32 = 2;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    /// Suggested remedy, printed under the message.
    pub suggestion: Option<String>,
    /// Extra verbatim output (e.g. type checker diagnostics).
    pub detail: Option<String>,
}

impl Finding {
    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(Severity::Critical, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            suggestion: None,
            detail: None,
        }
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Everything a hook concluded about one operation.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// The file path or command under inspection.
    pub subject: String,
    pub findings: Vec<Finding>,
    /// Closing hints printed when the operation is not blocked.
    pub tips: Vec<String>,
}

impl Evaluation {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    /// Worst severity wins: any critical blocks, any warning warns.
    pub fn verdict(&self) -> Verdict {
        match self.findings.iter().map(|f| f.severity).max() {
            Some(Severity::Critical) => Verdict::Block,
            Some(Severity::Warning) => Verdict::Warn,
            Some(Severity::Info) | None => Verdict::Allow,
        }
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.with_severity(severity).count()
    }

    pub fn has_critical(&self) -> bool {
        self.count(Severity::Critical) > 0
    }

    /// Message of the first critical finding, used as the audit reason.
    pub fn first_critical(&self) -> Option<&str> {
        self.with_severity(Severity::Critical)
            .next()
            .map(|f| f.message.as_str())
    }
}
