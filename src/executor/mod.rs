// Executor module - sandboxed command and code-snippet execution

pub mod config;
pub mod error;
pub mod process;
pub mod safety;
pub mod tool;
pub mod types;

pub use config::ExecutorConfig;
pub use error::{ExecutorError, Result};
pub use process::execute;
pub use safety::SafetyFilter;
pub use tool::{CodeRunnerArgs, CodeRunnerTool, ToolImpl};
pub use types::{
    ExecutionKind, ExecutionRequest, ExecutionResult, Language, SNIPPET_STREAM_CAP,
};
