//! Runtime settings resolved from CLI flags and environment variables.

use std::path::{Path, PathBuf};

pub const RULES_FILE_NAME: &str = "rules.md";
pub const DEFAULT_SERVER_NAME: &str = "Rules Enforcer Zero";
/// The one `AUTO_INJECT` value that turns auto-injection off.
pub const AUTO_INJECT_OFF: &str = "false";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// The rule root as given, before resolution. Kept for startup diagnostics.
    pub rule_root: Option<String>,
    /// Absolute path of the rules document.
    pub rules_path: PathBuf,
    pub server_name: String,
    pub auto_inject: bool,
}

impl Settings {
    pub fn resolve(
        rule_root: Option<String>,
        server_name: Option<String>,
        auto_inject: Option<&str>,
        cwd: &Path,
    ) -> Self {
        let rule_root = rule_root.filter(|r| !r.is_empty());
        Self {
            rules_path: resolve_rules_path(rule_root.as_deref(), cwd),
            rule_root,
            server_name: server_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            auto_inject: auto_inject != Some(AUTO_INJECT_OFF),
        }
    }
}

/// Resolve the configured rule root to the rules file path.
///
/// A value ending in `.md` names the file itself; anything else is treated as
/// the directory holding `rules.md`. Relative results are anchored at `cwd`.
pub fn resolve_rules_path(rule_root: Option<&str>, cwd: &Path) -> PathBuf {
    let path = match rule_root.filter(|r| !r.is_empty()) {
        Some(root) if root.ends_with(".md") => PathBuf::from(root),
        Some(root) => Path::new(root).join(RULES_FILE_NAME),
        None => PathBuf::from(RULES_FILE_NAME),
    };
    cwd.join(path)
}
