use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Project-relative location of the user overlay.
pub const OVERLAY_PATH: &str = ".claude/policygate.toml";

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub protected_files: ProtectedFiles,
    #[serde(default)]
    pub imports: ImportsConfig,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub typescript: TypescriptConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            memory_capacity: default_memory_capacity(),
            log_level: default_log_level(),
        }
    }
}

fn default_state_dir() -> String {
    ".claude".into()
}

fn default_memory_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "warn".into()
}

/// Modules that must not be duplicated, keyed by the short name that
/// identifies them inside a file name.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProtectedFiles {
    /// key → project-relative path of the one true file.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ImportsConfig {
    /// key → the only accepted import specifier for that module.
    #[serde(default)]
    pub canonical: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ShellConfig {
    /// Leading command words that pass the allow-list check.
    #[serde(default)]
    pub safe_commands: Vec<String>,
    /// Interpreters accepted as a leading word in addition to `safe_commands`.
    #[serde(default)]
    pub interpreters: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PaymentConfig {
    /// Path substrings (lowercase) that select a file for payment validation.
    #[serde(default)]
    pub path_keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TypescriptConfig {
    #[serde(default)]
    pub typecheck_command: String,
    #[serde(default)]
    pub typecheck_timeout_secs: u64,
    /// `{file}` is substituted with the edited file path.
    #[serde(default)]
    pub lint_command: String,
    #[serde(default)]
    pub lint_timeout_secs: u64,
}

// ── Overlay types (project config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    protected_files: ProtectedFilesOverlay,
    #[serde(default)]
    imports: ImportsOverlay,
    #[serde(default)]
    shell: ShellOverlay,
    #[serde(default)]
    payment: PaymentOverlay,
    #[serde(default)]
    typescript: TypescriptOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    state_dir: Option<String>,
    memory_capacity: Option<usize>,
    log_level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ProtectedFilesOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    paths: BTreeMap<String, String>,
    #[serde(default)]
    remove_paths: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ImportsOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    canonical: BTreeMap<String, String>,
    #[serde(default)]
    remove_canonical: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ShellOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    safe_commands: Vec<String>,
    #[serde(default)]
    interpreters: Vec<String>,
    #[serde(default)]
    remove_safe_commands: Vec<String>,
    #[serde(default)]
    remove_interpreters: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PaymentOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    path_keywords: Vec<String>,
    #[serde(default)]
    remove_path_keywords: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TypescriptOverlay {
    typecheck_command: Option<String>,
    typecheck_timeout_secs: Option<u64>,
    lint_command: Option<String>,
    lint_timeout_secs: Option<u64>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

/// Map counterpart of [`merge_list`]: removals first, then additions
/// overwrite by key.
fn merge_map(
    base: &mut BTreeMap<String, String>,
    add: BTreeMap<String, String>,
    remove: &[String],
    replace: bool,
) {
    if replace {
        *base = add;
    } else {
        base.retain(|key, _| !remove.contains(key));
        base.extend(add);
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the project overlay from `<project>/.claude/policygate.toml` (if exists)
    ///
    /// Lists extend, maps merge by key, scalars override.
    /// Set `replace = true` in any section to replace its defaults entirely.
    /// Use `remove_<field>` lists to subtract specific items from defaults.
    pub fn load(project_dir: &Path) -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay(project_dir) {
            config.apply_overlay(overlay);
        }
        config
    }

    fn load_overlay(project_dir: &Path) -> Option<ConfigOverlay> {
        let path = project_dir.join(OVERLAY_PATH);
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                eprintln!("cc-policygate: config parse error: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        // Settings: scalar overrides
        let s = overlay.settings;
        if let Some(v) = s.state_dir {
            self.settings.state_dir = v;
        }
        if let Some(v) = s.memory_capacity {
            self.settings.memory_capacity = v;
        }
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }

        let p = overlay.protected_files;
        merge_map(
            &mut self.protected_files.paths,
            p.paths,
            &p.remove_paths,
            p.replace,
        );

        let i = overlay.imports;
        merge_map(
            &mut self.imports.canonical,
            i.canonical,
            &i.remove_canonical,
            i.replace,
        );

        let sh = overlay.shell;
        merge_list(
            &mut self.shell.safe_commands,
            sh.safe_commands,
            &sh.remove_safe_commands,
            sh.replace,
        );
        merge_list(
            &mut self.shell.interpreters,
            sh.interpreters,
            &sh.remove_interpreters,
            sh.replace,
        );

        let pay = overlay.payment;
        merge_list(
            &mut self.payment.path_keywords,
            pay.path_keywords,
            &pay.remove_path_keywords,
            pay.replace,
        );

        let ts = overlay.typescript;
        if let Some(v) = ts.typecheck_command {
            self.typescript.typecheck_command = v;
        }
        if let Some(v) = ts.typecheck_timeout_secs {
            self.typescript.typecheck_timeout_secs = v;
        }
        if let Some(v) = ts.lint_command {
            self.typescript.lint_command = v;
        }
        if let Some(v) = ts.lint_timeout_secs {
            self.typescript.lint_timeout_secs = v;
        }
    }

    /// Resolve the state root: `~`/`$VAR` expanded, relative paths joined
    /// to the project directory. Falls back to the raw string when a
    /// variable is undefined.
    pub fn state_root(&self, project_dir: &Path) -> PathBuf {
        let raw = &self.settings.state_dir;
        let expanded = shellexpand::full(raw)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.clone());
        let path = PathBuf::from(expanded);
        if path.is_absolute() {
            path
        } else {
            project_dir.join(path)
        }
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::default_config();
        assert!(!config.protected_files.paths.is_empty());
        assert!(!config.imports.canonical.is_empty());
        assert!(!config.shell.safe_commands.is_empty());
        assert!(!config.payment.path_keywords.is_empty());
        assert_eq!(config.settings.memory_capacity, 100);
    }

    #[test]
    fn default_config_has_expected_entries() {
        let config = Config::default_config();
        assert_eq!(
            config.protected_files.paths.get("logger").map(String::as_str),
            Some("lib/utils/logger.ts")
        );
        assert_eq!(
            config
                .imports
                .canonical
                .get("payment.repository")
                .map(String::as_str),
            Some("../lib/repositories/payment.repository")
        );
        assert!(config.shell.safe_commands.contains(&"npm".to_string()));
        assert!(config.shell.interpreters.contains(&"python3".to_string()));
        assert_eq!(config.typescript.typecheck_timeout_secs, 30);
        assert_eq!(config.typescript.lint_timeout_secs, 15);
    }

    // ── Merge semantics ──

    #[test]
    fn overlay_extends_safe_commands() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [shell]
            safe_commands = ["pnpm"]
        "#,
        );
        assert!(config.shell.safe_commands.contains(&"npm".to_string()));
        assert!(config.shell.safe_commands.contains(&"pnpm".to_string()));
    }

    #[test]
    fn overlay_removes_safe_commands() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [shell]
            remove_safe_commands = ["mv", "cp"]
        "#,
        );
        assert!(!config.shell.safe_commands.contains(&"mv".to_string()));
        assert!(!config.shell.safe_commands.contains(&"cp".to_string()));
        assert!(config.shell.safe_commands.contains(&"ls".to_string()));
    }

    #[test]
    fn overlay_no_duplicates() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [shell]
            safe_commands = ["ls"]
        "#,
        );
        let count = config.shell.safe_commands.iter().filter(|s| *s == "ls").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn overlay_merges_protected_paths_by_key() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [protected_files]
            remove_paths = ["firebase"]

            [protected_files.paths]
            "logger" = "src/log.ts"
            "stripe.service" = "lib/services/payment/stripe.service.ts"
        "#,
        );
        let paths = &config.protected_files.paths;
        assert_eq!(paths.get("logger").map(String::as_str), Some("src/log.ts"));
        assert!(paths.contains_key("stripe.service"));
        assert!(!paths.contains_key("firebase"));
        assert!(paths.contains_key("qstash.service"));
    }

    #[test]
    fn overlay_replace_imports() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [imports]
            replace = true

            [imports.canonical]
            "logger" = "@/lib/logger"
        "#,
        );
        assert_eq!(config.imports.canonical.len(), 1);
    }

    #[test]
    fn overlay_scalar_overrides() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [settings]
            memory_capacity = 10

            [typescript]
            typecheck_command = "pnpm tsc --noEmit"
        "#,
        );
        assert_eq!(config.settings.memory_capacity, 10);
        assert_eq!(config.settings.state_dir, ".claude");
        assert_eq!(config.typescript.typecheck_command, "pnpm tsc --noEmit");
        assert_eq!(config.typescript.typecheck_timeout_secs, 30);
    }

    #[test]
    fn empty_overlay_changes_nothing() {
        let original = Config::default_config();
        let mut config = Config::default_config();
        config.apply_overlay_str("");
        assert_eq!(
            config.shell.safe_commands.len(),
            original.shell.safe_commands.len()
        );
        assert_eq!(
            config.protected_files.paths,
            original.protected_files.paths
        );
    }

    #[test]
    fn load_reads_project_overlay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        std::fs::write(
            dir.path().join(OVERLAY_PATH),
            "[payment]\npath_keywords = [\"billing\"]\n",
        )
        .unwrap();
        let config = Config::load(dir.path());
        assert!(config.payment.path_keywords.contains(&"billing".to_string()));
        assert!(config.payment.path_keywords.contains(&"webhook".to_string()));
    }

    #[test]
    fn load_ignores_broken_overlay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".claude")).unwrap();
        std::fs::write(dir.path().join(OVERLAY_PATH), "[shell\nbroken").unwrap();
        let config = Config::load(dir.path());
        assert_eq!(config.settings.memory_capacity, 100);
    }

    #[test]
    fn state_root_relative_and_absolute() {
        let mut config = Config::default_config();
        let project = Path::new("/srv/app");
        assert_eq!(config.state_root(project), PathBuf::from("/srv/app/.claude"));
        config.settings.state_dir = "/var/lib/policygate".into();
        assert_eq!(
            config.state_root(project),
            PathBuf::from("/var/lib/policygate")
        );
    }
}
