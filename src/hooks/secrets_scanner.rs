//! Shell command policy: dangerous patterns, inline secrets, environment
//! dumps, serverless-incompatible service managers and an allow-list of
//! leading commands.
//!
//! Every check is an independent regex over the raw command string; the
//! only tokenization is a whitespace split for the allow-list.

use std::sync::LazyLock;

use regex::Regex;

use crate::audit::AuditEntry;
use crate::config::Config;
use crate::eval::{Evaluation, Finding, HookError, Messages, Tool, ToolEvent, Verdict};
use crate::hooks::Hook;

struct Rule {
    re: Regex,
    message: &'static str,
}

fn rules(table: &[(&str, &'static str)], case_insensitive: bool) -> Vec<Rule> {
    let flag = if case_insensitive { "(?i)" } else { "" };
    table
        .iter()
        .map(|&(pattern, message)| Rule {
            re: Regex::new(&format!("{flag}{pattern}")).unwrap(),
            message,
        })
        .collect()
}

static DANGEROUS: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(
        &[
            (r"curl.*\|.*sh", "Pipe to shell is dangerous"),
            (r"rm\s+-rf\s+/", "rm -rf command is dangerous"),
            (r"chmod\s+777", "777 permissions are insecure"),
            (r"eval\s*\(", "eval() usage is dangerous"),
            (r"sudo\s+", "sudo usage requires confirmation"),
        ],
        true,
    )
});

static SECRETS: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(
        &[
            (
                r#"MERCADOPAGO_ACCESS_TOKEN\s*=\s*["'][^"']+["']"#,
                "MercadoPago token exposed",
            ),
            (
                r#"FIREBASE_PRIVATE_KEY\s*=\s*["'][^"']+["']"#,
                "Firebase private key exposed",
            ),
            (
                r#"AWS_SECRET_ACCESS_KEY\s*=\s*["'][^"']+["']"#,
                "AWS secret key exposed",
            ),
            (
                r#"UPSTASH_REDIS_REST_TOKEN\s*=\s*["'][^"']+["']"#,
                "Upstash token exposed",
            ),
            (
                r#"WEBHOOK_SECRET\s*=\s*["'][^"']+["']"#,
                "Webhook secret exposed",
            ),
            (r"APP_USR-\d+", "MercadoPago access token in code"),
            (r"TEST-\d+", "MercadoPago test token in code"),
            (r"PROD-\d+", "MercadoPago production token in code"),
        ],
        true,
    )
});

static ENV_EXPOSURE: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(
        &[
            (r"echo\s+\$[A-Z_]+", "Environment variable exposure"),
            (r"printenv", "Environment variable exposure"),
            (r"env\s*$", "Environment variable exposure"),
            (r"cat.*\.env", "Environment file exposure"),
        ],
        false,
    )
});

static SERVERLESS_INCOMPATIBLE: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(
        &[
            (r"pm2\s+start", "PM2 not compatible with Vercel Functions"),
            (r"forever\s+start", "Forever not compatible with serverless"),
            (r"systemctl\s+start", "systemctl not available in serverless"),
            (r"service\s+\w+\s+start", "Services not available in serverless"),
            (r"nginx\s+(start|restart)", "Nginx not needed in Vercel"),
            (r"apache2\s+(start|restart)", "Apache not needed in Vercel"),
        ],
        true,
    )
});

const REDACTED: &str = "[REDACTED]";

static MESSAGES: Messages = Messages {
    checking: "Scanning command:",
    blocked: "Security scan failed:",
    block_footer: &["Command blocked by security policy"],
    warnings: "Security warnings:",
    passed: "Command approved.",
    pass_with_warnings: true,
};

/// Replace every inline secret with a placeholder before the command is persisted.
pub fn redact(command: &str) -> String {
    SECRETS.iter().fold(command.to_string(), |acc, rule| {
        rule.re.replace_all(&acc, REDACTED).into_owned()
    })
}

pub struct SecretsScanner {
    safe_commands: Vec<String>,
    interpreters: Vec<String>,
}

impl SecretsScanner {
    pub fn new(config: &Config) -> Self {
        Self {
            safe_commands: config.shell.safe_commands.clone(),
            interpreters: config.shell.interpreters.clone(),
        }
    }

    /// Allow-list test on the first whitespace-separated word.
    fn unlisted_leader<'a>(&self, command: &'a str) -> Option<&'a str> {
        let first = command.split_whitespace().next()?;
        if first.starts_with("./") {
            return None;
        }
        let base = first.rsplit('/').next().unwrap_or(first);
        let listed = self
            .safe_commands
            .iter()
            .chain(&self.interpreters)
            .any(|c| c == base);
        (!listed).then_some(first)
    }

    /// Evaluate a command string directly.
    pub fn scan(&self, command: &str) -> Evaluation {
        let mut eval = Evaluation::new(command);

        for rule in DANGEROUS.iter() {
            if let Some(m) = rule.re.find(command) {
                eval.push(Finding::critical(format!(
                    "{}: `{}`",
                    rule.message,
                    m.as_str().trim()
                )));
            }
        }

        for rule in SECRETS.iter() {
            if rule.re.is_match(command) {
                eval.push(
                    Finding::critical(rule.message)
                        .suggest("Read secrets from the environment; never inline them in commands"),
                );
            }
        }

        if let Some(first) = self.unlisted_leader(command) {
            eval.push(Finding::warning(format!("Unwhitelisted command: {first}")));
        }

        for rule in ENV_EXPOSURE.iter() {
            if rule.re.is_match(command) {
                eval.push(
                    Finding::critical(rule.message)
                        .suggest("Check that a variable is set without printing its value"),
                );
            }
        }

        for rule in SERVERLESS_INCOMPATIBLE.iter() {
            if rule.re.is_match(command) {
                eval.push(Finding::warning(rule.message));
            }
        }

        eval
    }
}

impl Hook for SecretsScanner {
    fn name(&self) -> &'static str {
        "secrets-scanner"
    }

    fn messages(&self) -> &'static Messages {
        &MESSAGES
    }

    fn subject(&self, event: &ToolEvent) -> Option<String> {
        (event.tool == Tool::Bash && !event.command.is_empty()).then(|| event.command.clone())
    }

    fn evaluate(&self, event: &ToolEvent) -> Result<Evaluation, HookError> {
        Ok(self.scan(&event.command))
    }

    fn audit_entry(&self, event: &ToolEvent, eval: &Evaluation, verdict: Verdict) -> AuditEntry {
        let mut redacted_eval = eval.clone();
        redacted_eval.subject = redact(&eval.subject);
        for finding in &mut redacted_eval.findings {
            finding.message = redact(&finding.message);
        }
        AuditEntry::for_command(
            self.name(),
            AuditEntry::action_for(verdict),
            &redact(&event.command),
            &redacted_eval,
        )
    }
}
