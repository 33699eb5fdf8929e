// Agent configuration

use std::path::PathBuf;
use tracing::warn;

/// Parse an environment variable, logging a warning if the value is present but invalid.
fn parse_env_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => match v.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = name, value = %v, "Invalid env var value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Timeout for each plan step, in seconds
    pub plan_step_timeout_secs: u64,
    /// Timeout for model-requested code snippets, in seconds
    pub code_timeout_secs: u64,
    /// Whether externally-sourced shell commands pass the deny-list
    pub filter_commands: bool,
    /// Optional TOML file with extra deny patterns
    pub deny_patterns_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            plan_step_timeout_secs: 30,
            code_timeout_secs: 10,
            filter_commands: true,
            deny_patterns_path: None,
        }
    }
}

impl AgentConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = AgentConfig::default();

        config.plan_step_timeout_secs =
            parse_env_var("AGENT_PLAN_TIMEOUT_SECS", config.plan_step_timeout_secs);
        config.code_timeout_secs =
            parse_env_var("AGENT_CODE_TIMEOUT_SECS", config.code_timeout_secs);
        config.filter_commands = parse_env_var("AGENT_FILTER_COMMANDS", config.filter_commands);
        config.deny_patterns_path = std::env::var("AGENT_DENY_PATTERNS").ok().map(PathBuf::from);

        config
    }
}
