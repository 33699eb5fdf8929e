// Safety filter - static deny-list for externally-sourced shell commands

use crate::executor::error::Result;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Built-in dangerous command patterns. Matching is case-insensitive
/// substring containment against the lower-cased command text.
const DEFAULT_DENY_PATTERNS: &[&str] = &[
    "rm -rf /",
    "format",
    "fdisk",
    "dd if=",
    "> /dev/",
    "chmod 777",
    "curl | bash",
    "wget | bash",
    "sudo rm",
    "del /f /q",
    "rmdir /s",
];

/// Advisory pre-check for obviously dangerous commands.
///
/// This is defense-in-depth, not a sandbox: a semantically dangerous command
/// that matches no pattern passes. Known limitation, kept as-is.
#[derive(Debug, Clone)]
pub struct SafetyFilter {
    patterns: Vec<String>,
}

/// On-disk shape for extra patterns: `[safety] deny = ["..."]`
#[derive(Debug, Deserialize)]
struct SafetyFile {
    safety: SafetySection,
}

#[derive(Debug, Deserialize)]
struct SafetySection {
    #[serde(default)]
    deny: Vec<String>,
}

impl SafetyFilter {
    /// Filter with the built-in deny-list.
    pub fn new() -> Self {
        Self {
            patterns: DEFAULT_DENY_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }

    /// Append extra patterns (stored lower-cased).
    pub fn extend(&mut self, patterns: impl IntoIterator<Item = String>) {
        self.patterns
            .extend(patterns.into_iter().map(|p| p.to_lowercase()));
    }

    /// Load extra patterns from a TOML file and append them.
    /// A missing file is not an error.
    pub fn load_extra_patterns(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            debug!(path = %path.display(), "deny-pattern file not found, using built-ins only");
            return Ok(());
        }

        let content = std::fs::read_to_string(path)?;
        let file: SafetyFile = toml::from_str(&content)?;

        debug!(
            path = %path.display(),
            extra_patterns = file.safety.deny.len(),
            "loaded extra deny patterns"
        );
        self.extend(file.safety.deny);
        Ok(())
    }

    /// True when no deny pattern matches the command.
    pub fn is_safe(&self, command: &str) -> bool {
        let lowered = command.to_lowercase();
        match self.patterns.iter().find(|p| lowered.contains(p.as_str())) {
            Some(pattern) => {
                warn!(pattern = %pattern, "command matched deny-list");
                false
            }
            None => true,
        }
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for SafetyFilter {
    fn default() -> Self {
        Self::new()
    }
}
