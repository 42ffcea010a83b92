//! Validates import specifiers and restricted API hosts in text being
//! written (Write) or inserted (Edit, MultiEdit).
//!
//! Matching is regex over raw text: imports inside comments or strings
//! count the same as real ones.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Config;
use crate::eval::{Evaluation, Finding, HookError, Messages, ToolEvent};
use crate::hooks::{Hook, has_extension, naming};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+(?:\{[^}]+\}|[^;]+)\s+from\s+['"]([^'"]+)['"]"#).unwrap()
});

static RELATIVE_PARENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"from\s+['"](\.\./[^'"\s]+)['"]"#).unwrap());

const SCRIPT_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx"];
const TYPESCRIPT_EXTENSIONS: &[&str] = &[".ts", ".tsx"];
const RESOLVABLE_EXTENSIONS: &[&str] = &[".js", ".ts", ".tsx", ".json"];

/// Hosts that must only be reached through the internal service layer.
struct RestrictedHost {
    needles: &'static [&'static str],
    message: &'static str,
    suggestion: &'static str,
}

const RESTRICTED_HOSTS: &[RestrictedHost] = &[
    RestrictedHost {
        needles: &["api.mercadopago.com"],
        message: "Direct MercadoPago API call detected",
        suggestion: "Use MercadoPagoService from lib/services/payment/mercadopago.service",
    },
    RestrictedHost {
        needles: &["firebase.google.com/v1", "firebaseio.com"],
        message: "Direct Firebase API call detected",
        suggestion: "Use Firebase services from lib/services/firebase",
    },
];

static MESSAGES: Messages = Messages {
    checking: "Validating imports and file creation:",
    blocked: "CRITICAL ISSUES FOUND - BLOCKING OPERATION:",
    block_footer: &["Apply the suggested fixes and try again."],
    warnings: "Warnings found (operation allowed):",
    passed: "Import validation passed! No issues found.",
    pass_with_warnings: false,
};

pub struct ImportValidator {
    canonical: BTreeMap<String, String>,
}

impl ImportValidator {
    pub fn new(config: &Config) -> Self {
        Self {
            canonical: config.imports.canonical.clone(),
        }
    }

    fn check_file_name(&self, path: &str, name: &str, eval: &mut Evaluation) {
        if naming::is_backup_name(name) {
            eval.push(
                Finding::critical(format!(
                    "Never create backup files ({name}). Git handles versioning."
                ))
                .suggest("Remove backup file creation. Use git for version control."),
            );
        }
        if name.to_lowercase().contains("logger") && naming::in_endpoint_dir(path) {
            let target = self.canonical_or("logger", "../lib/utils/logger");
            eval.push(
                Finding::critical("Never duplicate logger in api/. Use lib/utils/logger.")
                    .suggest(format!(
                        "Import from '{target}' instead of creating local logger."
                    )),
            );
        }
    }

    fn check_imports(&self, path: &str, text: &str, eval: &mut Evaluation) {
        if !has_extension(path, SCRIPT_EXTENSIONS) {
            return;
        }
        let in_api = naming::in_endpoint_dir(path);

        for caps in IMPORT_RE.captures_iter(text) {
            let spec = &caps[1];

            if in_api && spec.contains("./logger") {
                let target = self.canonical_or("logger", "../lib/utils/logger");
                eval.push(
                    Finding::critical(format!("Incorrect import from ./logger: '{spec}'"))
                        .suggest(format!(
                            "Change to: import {{ logInfo, logError }} from '{target}'"
                        )),
                );
            }

            for (key, correct) in &self.canonical {
                if spec.contains(key.as_str()) && spec != correct && !spec.starts_with("../lib/") {
                    eval.push(
                        Finding::warning(format!(
                            "Import {key} from incorrect location: '{spec}'"
                        ))
                        .suggest(format!("Use: import from '{correct}'")),
                    );
                }
            }
        }

        for host in RESTRICTED_HOSTS {
            if host.needles.iter().any(|n| text.contains(n)) {
                eval.push(Finding::critical(host.message).suggest(host.suggestion));
            }
        }
    }

    /// Relative parent imports in serverless endpoints should carry an
    /// explicit extension.
    fn check_resolution(&self, path: &str, text: &str, eval: &mut Evaluation) {
        if !has_extension(path, TYPESCRIPT_EXTENSIONS) || !naming::in_endpoint_dir(path) {
            return;
        }
        for caps in RELATIVE_PARENT_RE.captures_iter(text) {
            let spec = &caps[1];
            if !has_extension(spec, RESOLVABLE_EXTENSIONS) {
                eval.push(
                    Finding::info(format!(
                        "Consider adding .js extension for Vercel compatibility: '{spec}'"
                    ))
                    .suggest(format!(
                        "In Vercel functions, use '{spec}.js' for better compatibility"
                    )),
                );
            }
        }
    }

    fn canonical_or<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.canonical.get(key).map(String::as_str).unwrap_or(fallback)
    }
}

impl Hook for ImportValidator {
    fn name(&self) -> &'static str {
        "import-validator"
    }

    fn messages(&self) -> &'static Messages {
        &MESSAGES
    }

    fn subject(&self, event: &ToolEvent) -> Option<String> {
        event.proposed_text()?;
        (!event.file_path.is_empty()).then(|| event.file_path.clone())
    }

    fn evaluate(&self, event: &ToolEvent) -> Result<Evaluation, HookError> {
        let path = event.file_path.as_str();
        let text = event.proposed_text().unwrap_or_default();
        let mut eval = Evaluation::new(path);

        self.check_file_name(path, event.file_name(), &mut eval);
        self.check_imports(path, &text, &mut eval);
        self.check_resolution(path, &text, &mut eval);

        Ok(eval)
    }
}
