// Tool trait and the code_runner implementation

use crate::executor::config::ExecutorConfig;
use crate::executor::error::{ExecutorError, Result};
use crate::executor::process;
use crate::executor::types::{ExecutionRequest, ExecutionResult, Language};
use crate::moonshot::ToolDefinition;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

/// Internal trait for tool implementations dispatched from model responses.
#[async_trait]
pub trait ToolImpl: Send + Sync {
    /// Wire-format tool declaration sent to the model.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool against raw JSON arguments from a tool call.
    async fn run(&self, arguments: &str) -> Result<ExecutionResult>;
}

/// Arguments of a `code_runner` tool call.
///
/// Parsing fails closed: unknown fields and unsupported language values are
/// rejected outright instead of trusting model-supplied structure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeRunnerArgs {
    pub language: Language,
    pub code: String,
}

/// The one tool the dispatcher serves: runs a Python or JavaScript snippet
/// in an isolated interpreter subprocess.
pub struct CodeRunnerTool {
    exec_config: ExecutorConfig,
    timeout_secs: u64,
}

impl CodeRunnerTool {
    pub const NAME: &'static str = "code_runner";

    pub fn new(exec_config: ExecutorConfig, timeout_secs: u64) -> Self {
        Self {
            exec_config,
            timeout_secs,
        }
    }

    /// Strict schema-validated parse of tool-call arguments.
    pub fn parse_args(arguments: &str) -> Result<CodeRunnerArgs> {
        serde_json::from_str(arguments)
            .map_err(|e| ExecutorError::InvalidInput(Self::NAME.to_string(), e.to_string()))
    }
}

#[async_trait]
impl ToolImpl for CodeRunnerTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            Self::NAME,
            "Execute Python or JavaScript code and return the result",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "language": {
                        "type": "string",
                        "enum": ["python", "javascript"]
                    },
                    "code": {
                        "type": "string",
                        "description": "Source code to execute"
                    }
                },
                "required": ["language", "code"]
            }),
        )
    }

    async fn run(&self, arguments: &str) -> Result<ExecutionResult> {
        // Rejecting bad arguments here guarantees nothing is spawned for a
        // malformed or unsupported-language call.
        let args = Self::parse_args(arguments)?;

        debug!(
            language = %args.language,
            code_bytes = args.code.len(),
            "running code snippet"
        );

        let request = ExecutionRequest::code(args.language, args.code, self.timeout_secs);
        let result = process::execute(&self.exec_config, &request).await;

        info!(
            language = %args.language,
            exit_code = result.exit_code,
            timed_out = result.timed_out,
            "code snippet finished"
        );
        Ok(result)
    }
}
