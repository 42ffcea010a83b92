//! Convention rules for TypeScript sources, then the project type check and
//! a fire-and-forget lint autofix.

use std::path::{Path, PathBuf};

use crate::checker::ExternalCheck;
use crate::eval::{Evaluation, Finding, HookError, Messages, ToolEvent};
use crate::hooks::{Hook, has_extension, read_target, resolve};

const TYPESCRIPT_EXTENSIONS: &[&str] = &[".ts", ".tsx"];

static MESSAGES: Messages = Messages {
    checking: "Validating TypeScript:",
    blocked: "CRITICAL ISSUES found:",
    block_footer: &["Fix critical issues before continuing"],
    warnings: "Warnings found:",
    passed: "TypeScript validation passed!",
    pass_with_warnings: true,
};

/// The five project conventions. `rel_path` is relative to the project root.
pub fn check_conventions(rel_path: &str, content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let lower = content.to_lowercase();
    let is_ts = rel_path.ends_with(".ts");
    let is_tsx = rel_path.ends_with(".tsx");

    if is_ts && lower.contains("mercadopago") && content.contains("https://api.mercadopago.com") {
        findings.push(
            Finding::critical("Use MercadoPagoService, not direct API calls")
                .suggest("Import from lib/services/payment/mercadopago.service"),
        );
    }

    if is_ts
        && lower.contains("firebase")
        && content.contains("initializeApp")
        && !content.contains("getApps()")
    {
        findings.push(
            Finding::warning("Use Factory Pattern for Firebase initialization")
                .suggest("Guard initializeApp with getApps().length"),
        );
    }

    if is_ts && rel_path.starts_with("api/") && content.contains("req.body") && !content.contains(".parse(")
    {
        findings.push(
            Finding::critical("Use Zod validation for API endpoints")
                .suggest("Parse req.body with a Zod schema (schema.parse(req.body))"),
        );
    }

    if (content.contains("logInfo") || content.contains("logError"))
        && !content.contains("correlationId")
    {
        findings.push(Finding::warning("Include correlationId in logging"));
    }

    let rel_lower = rel_path.to_lowercase();
    if is_tsx
        && (rel_lower.contains("mercadopago") || rel_lower.contains("payment"))
        && !content.contains("MP_DEVICE_SESSION_ID")
        && !content.contains("device_id")
    {
        findings.push(Finding::warning("Device ID required for MercadoPago payments"));
    }

    findings
}

pub struct TypescriptValidator {
    project_dir: PathBuf,
    checker: Box<dyn ExternalCheck>,
}

impl TypescriptValidator {
    pub fn new(project_dir: &Path, checker: Box<dyn ExternalCheck>) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            checker,
        }
    }

    /// Path relative to the project root, `/`-separated; unchanged when the
    /// file lies outside it.
    fn relative(&self, path: &str) -> String {
        let full = resolve(&self.project_dir, path);
        match full.strip_prefix(&self.project_dir) {
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path.to_string(),
        }
    }

    fn type_check(&self, eval: &mut Evaluation) {
        match self.checker.type_check() {
            Ok(out) if out.success => {}
            Ok(out) => {
                let detail = [out.stdout.trim(), out.stderr.trim()]
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                eval.push(
                    Finding::critical("TypeScript errors detected")
                        .suggest("Fix TypeScript errors before continuing")
                        .with_detail(detail),
                );
            }
            Err(e) => {
                eval.push(
                    Finding::critical(format!("TypeScript check failed: {e}"))
                        .suggest("Fix TypeScript errors before continuing"),
                );
            }
        }
    }

    fn lint_fix(&self, path: &str, eval: &mut Evaluation) {
        let file = resolve(&self.project_dir, path);
        match self.checker.lint_fix(&file) {
            Ok(_) => eval.tips.push("ESLint auto-fix applied".into()),
            Err(e) => log::debug!("typescript-validator: lint skipped: {e}"),
        }
    }
}

impl Hook for TypescriptValidator {
    fn name(&self) -> &'static str {
        "typescript-validator"
    }

    fn messages(&self) -> &'static Messages {
        &MESSAGES
    }

    fn subject(&self, event: &ToolEvent) -> Option<String> {
        has_extension(&event.file_path, TYPESCRIPT_EXTENSIONS).then(|| event.file_path.clone())
    }

    fn evaluate(&self, event: &ToolEvent) -> Result<Evaluation, HookError> {
        let path = event.file_path.as_str();
        let content = read_target(&self.project_dir, path)?;
        let mut eval = Evaluation::new(path);

        eval.extend(check_conventions(&self.relative(path), &content));
        if eval.has_critical() {
            return Ok(eval);
        }

        self.type_check(&mut eval);
        if eval.has_critical() {
            return Ok(eval);
        }

        self.lint_fix(path, &mut eval);
        Ok(eval)
    }
}
