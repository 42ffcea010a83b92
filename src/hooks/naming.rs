use std::sync::LazyLock;

use regex::{Regex, RegexSet};

/// Basename patterns of manually made backup copies. Case-insensitive.
const BACKUP_PATTERNS: &[&str] = &[
    r"\.bak$",
    r"\.backup$",
    r"\.old$",
    r"\.orig$",
    r"\.save$",
    r"\.tmp$",
    r"^_backup_",
    r"^backup_",
    r"^old_",
    r"_backup\.",
    r"_old\.",
    r"_backup_",
    r"_old_",
    r"~$",
    r"\(copy\)",
    r"\.copy$",
];

/// Basename patterns of transient or scratch files. Case-insensitive.
const TRANSIENT_PATTERNS: &[&str] = &[
    r"test\.ts$",
    r"temp\.ts$",
    r"tmp\.ts$",
    r"\.log$",
    r"\.pid$",
    r"\.lock$",
];

static BACKUP_SET: LazyLock<RegexSet> = LazyLock::new(|| case_insensitive_set(BACKUP_PATTERNS));

static TRANSIENT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    TRANSIENT_PATTERNS
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
        .collect()
});

fn case_insensitive_set(patterns: &[&str]) -> RegexSet {
    RegexSet::new(patterns.iter().map(|p| format!("(?i){p}"))).unwrap()
}

/// Directory segment reserved for endpoint definitions.
pub const ENDPOINT_DIR: &str = "/api/";

/// Suffixes an endpoint file may legitimately end with.
const ENDPOINT_SUFFIXES: &[&str] = &["-webhook.ts", "-processor.ts", ".ts"];

/// Basename fragments that mark a utility module.
const UTILITY_MARKERS: &[&str] = &["logger", "utils", "helper"];

/// True when the basename looks like a manual backup copy.
pub fn is_backup_name(file_name: &str) -> bool {
    BACKUP_SET.is_match(file_name)
}

/// Number of transient-file patterns the basename matches.
pub fn transient_matches(file_name: &str) -> usize {
    TRANSIENT.iter().filter(|re| re.is_match(file_name)).count()
}

/// True for absolute paths containing `/api/` and for project-relative
/// paths starting with `api/` (or `./api/`).
pub fn in_endpoint_dir(path: &str) -> bool {
    let relative = path.strip_prefix("./").unwrap_or(path);
    relative.starts_with(&ENDPOINT_DIR[1..]) || path.contains(ENDPOINT_DIR)
}

/// A utility-sounding file placed in the endpoint directory.
pub fn is_misplaced_utility(path: &str, file_name: &str) -> bool {
    in_endpoint_dir(path)
        && file_name != "tsconfig.json"
        && !ENDPOINT_SUFFIXES.iter().any(|s| file_name.ends_with(s))
        && UTILITY_MARKERS.iter().any(|m| file_name.contains(m))
}
