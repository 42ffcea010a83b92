use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;

use simplelog::{LevelFilter, WriteLogger};

/// Diagnostic log file under `<state_root>/logs/`.
pub const DEBUG_LOG: &str = "policygate-debug.log";

/// Route `log` output to `<state_root>/logs/policygate-debug.log`.
/// Best-effort: failures are silently ignored (logging must never block the hook).
pub fn init(state_root: &Path, level: &str) {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Warn);
    if level == LevelFilter::Off {
        return;
    }
    let log_dir = state_root.join(crate::audit::LOG_DIR);
    if std::fs::create_dir_all(&log_dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(DEBUG_LOG))
    else {
        return;
    };
    let _ = WriteLogger::init(level, simplelog::Config::default(), file);
}

/// Local time in RFC 3339, the timestamp format of every persisted record.
pub fn timestamp_now() -> String {
    chrono::Local::now().to_rfc3339()
}
