// Data types for Executor module

use serde::{Deserialize, Serialize};

/// Character cap applied to each output stream of a code-snippet execution.
/// Shell executions are not truncated.
pub const SNIPPET_STREAM_CAP: usize = 1000;

/// Interpreter language for code-snippet execution.
///
/// Deserialization fails closed: any value outside this set is rejected
/// before a subprocess can be spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = crate::executor::ExecutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" => Ok(Language::Python),
            "javascript" => Ok(Language::Javascript),
            other => Err(crate::executor::ExecutorError::UnsupportedLanguage(
                other.to_string(),
            )),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of subprocess an execution request spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    /// Run the payload through the system shell.
    Shell,
    /// Feed the payload to an isolated interpreter on stdin.
    Code(Language),
}

/// A single execution request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub kind: ExecutionKind,
    pub payload: String,
    pub timeout_secs: u64,
}

impl ExecutionRequest {
    pub fn shell(payload: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            kind: ExecutionKind::Shell,
            payload: payload.into(),
            timeout_secs,
        }
    }

    pub fn code(language: Language, payload: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            kind: ExecutionKind::Code(language),
            payload: payload.into(),
            timeout_secs,
        }
    }
}

/// Outcome of one execution request.
///
/// Every request produces exactly one result; timeouts and spawn failures
/// are represented here rather than raised. The serialized form is the wire
/// contract with the model: `{"stdout", "stderr", "exit_code"}`. `timed_out`
/// is host-side bookkeeping and never leaves the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    #[serde(skip)]
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Build a result from captured subprocess output, truncating each
    /// stream to `cap` characters when one is given.
    pub fn from_output(stdout: String, stderr: String, exit_code: i32, cap: Option<usize>) -> Self {
        let (stdout, stderr) = match cap {
            Some(cap) => (truncate_chars(stdout, cap), truncate_chars(stderr, cap)),
            None => (stdout, stderr),
        };
        Self {
            stdout,
            stderr,
            exit_code,
            timed_out: false,
        }
    }

    /// Synthetic result for a subprocess that exceeded its time budget.
    pub fn timeout() -> Self {
        Self {
            stdout: String::new(),
            stderr: "Execution timed out".to_string(),
            exit_code: -1,
            timed_out: true,
        }
    }

    /// Synthetic result for a spawn or IO failure.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            exit_code: -1,
            timed_out: false,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Truncate a string to at most `cap` characters, respecting char boundaries.
fn truncate_chars(s: String, cap: usize) -> String {
    match s.char_indices().nth(cap) {
        Some((idx, _)) => {
            let mut s = s;
            s.truncate(idx);
            s
        }
        None => s,
    }
}
