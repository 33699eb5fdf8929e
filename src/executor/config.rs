// Executor configuration

use std::path::PathBuf;

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Shell binary for shell-command execution
    pub shell: String,
    /// Python interpreter for code snippets
    pub python_bin: String,
    /// Node interpreter for code snippets
    pub node_bin: String,
    /// Working directory override; inherited from the caller when None
    pub working_dir: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell: String::from("/bin/sh"),
            python_bin: String::from("python3"),
            node_bin: String::from("node"),
            working_dir: None,
        }
    }
}
