//! Validates MercadoPago payment, checkout and webhook files as they are
//! on disk.
//!
//! Six independent rule families run over the file content. They are plain
//! substring tests: no code structure is parsed and nothing is shared
//! across files.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::eval::{Evaluation, Finding, HookError, Messages, ToolEvent};
use crate::hooks::{Hook, read_target};

/// Side effects that must run from the job queue, never inline in a webhook.
const DEFERRED_OPERATIONS: &[&str] = &[
    "createProfile",
    "generateQRCode",
    "sendEmail",
    "processApprovedPayment",
];

/// Subscription tiers and the price literal each must show.
const PLANS: &[(&str, &str, &str)] = &[
    ("basic", "55", "Basic plan should cost R$ 55.00"),
    ("premium", "85", "Premium plan should cost R$ 85.00"),
];

static MESSAGES: Messages = Messages {
    checking: "Validating MercadoPago:",
    blocked: "CRITICAL MercadoPago issues:",
    block_footer: &[
        "Approval rate will be SEVERELY impacted!",
        "Fix critical issues before continuing",
    ],
    warnings: "MercadoPago warnings found (consider fixing for better approval rate):",
    passed: "MercadoPago validation passed!",
    pass_with_warnings: true,
};

fn contains_any(content: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| content.contains(n))
}

fn mentions_webhook(content: &str) -> bool {
    content.to_lowercase().contains("webhook")
}

/// (a) The client device fingerprint feeds fraud scoring.
pub fn check_device_id(content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    if !contains_any(content, &["MP_DEVICE_SESSION_ID", "device_id"]) {
        findings.push(
            Finding::critical("Device ID required for MercadoPago approval rate")
                .suggest("Collect MP_DEVICE_SESSION_ID on the client and send it as device_id"),
        );
    }
    if content.contains("device_id") && !contains_any(content, &["if (!device_id", "if (!deviceId"])
    {
        findings.push(Finding::warning("Device ID should be validated before use"));
    }
    findings
}

/// (b) Webhooks verify the signature and never call the API directly.
pub fn check_webhook_signature(content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    if !mentions_webhook(content) {
        return findings;
    }
    if !contains_any(content, &["validateWebhook", "createHmac"]) {
        findings.push(
            Finding::critical("HMAC validation required in webhooks")
                .suggest("Verify the x-signature header with validateWebhook before processing"),
        );
    }
    if !contains_any(content, &["x-signature", "x-request-id"]) {
        findings.push(Finding::warning(
            "Headers x-signature and x-request-id required",
        ));
    }
    if content.contains("https://api.mercadopago.com") {
        findings.push(
            Finding::critical("Use MercadoPagoService, not direct API")
                .suggest("Route calls through lib/services/payment/mercadopago.service"),
        );
    }
    findings
}

/// (c) Payment Brick setup carries the fields that raise approval.
pub fn check_payment_brick(content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    if !(content.contains("Payment") && content.contains("Brick")) {
        return findings;
    }
    if content.contains("payer") && !content.contains("email") {
        findings.push(Finding::warning("Email should be pre-filled in Payment Brick"));
    }
    if !content.contains("paymentMethods") {
        findings.push(Finding::warning("Payment methods should be configured"));
    }
    if !contains_any(content, &["additional_info", "additionalInfo"]) {
        findings.push(Finding::warning(
            "additional_info required for better approval",
        ));
    }
    findings
}

/// (d) Webhooks only enqueue; side effects run from the queue.
pub fn check_async_processing(content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    if !mentions_webhook(content) {
        return findings;
    }
    let uses_queue = content.to_lowercase().contains("qstash");
    for op in DEFERRED_OPERATIONS {
        if content.contains(op) && !uses_queue {
            findings.push(
                Finding::critical(format!("{op} should be async via QStash"))
                    .suggest("Enqueue a job with lib/services/queue/qstash.service instead"),
            );
        }
    }
    if content.contains("approved") && !content.contains("enqueue") {
        findings.push(Finding::critical("Webhooks should only enqueue jobs"));
    }
    findings
}

/// (e) The two subscription tiers keep their fixed prices and naming.
pub fn check_plans(content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    let lower = content.to_lowercase();
    for (tier, price, message) in PLANS {
        if lower.contains(tier) && !content.contains(price) {
            findings.push(Finding::warning(*message));
        }
    }
    if content.contains("title") && !content.contains("SOS Moto") {
        findings.push(Finding::warning("Product title should mention SOS Moto"));
    }
    findings
}

/// (f) Payment requests carry correlation and idempotency identifiers.
pub fn check_correlation(content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    if !contains_any(content, &["payment", "mercadopago", "webhook"]) {
        return findings;
    }
    if !contains_any(content, &["correlationId", "correlation_id"]) {
        findings.push(Finding::warning("Correlation ID required for tracking"));
    }
    if !contains_any(content, &["X-Idempotency-Key", "idempotency"]) {
        findings.push(Finding::warning("X-Idempotency-Key required for requests"));
    }
    findings
}

/// Run every rule family over `content`.
pub fn validate(content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(check_device_id(content));
    findings.extend(check_webhook_signature(content));
    findings.extend(check_payment_brick(content));
    findings.extend(check_async_processing(content));
    findings.extend(check_plans(content));
    findings.extend(check_correlation(content));
    findings
}

pub struct PaymentValidator {
    path_keywords: Vec<String>,
    project_dir: PathBuf,
}

impl PaymentValidator {
    pub fn new(config: &Config, project_dir: &Path) -> Self {
        Self {
            path_keywords: config
                .payment
                .path_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            project_dir: project_dir.to_path_buf(),
        }
    }

    fn applies_to(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        self.path_keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

impl Hook for PaymentValidator {
    fn name(&self) -> &'static str {
        "payment-validator"
    }

    fn messages(&self) -> &'static Messages {
        &MESSAGES
    }

    fn subject(&self, event: &ToolEvent) -> Option<String> {
        self.applies_to(&event.file_path)
            .then(|| event.file_path.clone())
    }

    fn evaluate(&self, event: &ToolEvent) -> Result<Evaluation, HookError> {
        let content = read_target(&self.project_dir, &event.file_path)?;
        let mut eval = Evaluation::new(&event.file_path);
        eval.extend(validate(&content));

        let lower = event.file_path.to_lowercase();
        if lower.contains("checkout") {
            eval.tips.push("Ensure Device ID is collected correctly".into());
        } else if lower.contains("webhook") {
            eval.tips
                .push("Remember to only enqueue jobs, not process sync".into());
        }
        Ok(eval)
    }
}
