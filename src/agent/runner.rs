// Plan runner - sequential shell-plan execution with cooperative cancellation

use crate::executor::{
    self, ExecutionRequest, ExecutionResult, ExecutorConfig, SafetyFilter,
};

use super::config::AgentConfig;
use super::error::AgentError;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::info;

/// Cooperative cancellation token shared between a runner and its caller.
///
/// The runner observes it only between plan lines; a command already in
/// flight finishes or times out on its own.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One executed (or rejected) plan line.
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub command: String,
    pub result: ExecutionResult,
}

/// Outcome of a full plan run. No rollback is attempted on partial
/// execution; earlier side effects stay in place.
#[derive(Debug, Clone, Default)]
pub struct PlanReport {
    pub steps: Vec<PlanStep>,
    pub cancelled: bool,
}

/// Sequential executor for newline-delimited shell plans.
///
/// Blank lines and `#`-prefixed lines are skipped. When filtering is
/// enabled, every line passes the deny-list first; blocked lines are
/// recorded as rejected results and the plan continues.
#[derive(Clone)]
pub struct PlanRunner {
    exec_config: ExecutorConfig,
    step_timeout_secs: u64,
    filter: Option<SafetyFilter>,
}

impl PlanRunner {
    pub fn new(
        exec_config: ExecutorConfig,
        step_timeout_secs: u64,
        filter: Option<SafetyFilter>,
    ) -> Self {
        Self {
            exec_config,
            step_timeout_secs,
            filter,
        }
    }

    /// Build from agent config, loading extra deny patterns when configured.
    pub fn from_config(
        agent_config: &AgentConfig,
        exec_config: ExecutorConfig,
    ) -> executor::Result<Self> {
        let filter = if agent_config.filter_commands {
            let mut filter = SafetyFilter::new();
            if let Some(path) = &agent_config.deny_patterns_path {
                filter.load_extra_patterns(path)?;
            }
            Some(filter)
        } else {
            None
        };

        Ok(Self::new(
            exec_config,
            agent_config.plan_step_timeout_secs,
            filter,
        ))
    }

    /// Run a single command and format its result for display.
    pub async fn run_command(&self, command: &str) -> String {
        let result = self.run_line(command).await;
        format_result(&result)
    }

    /// Execute the plan top to bottom, observing the token between lines.
    pub async fn run(&self, plan: &str, cancel: CancelToken) -> PlanReport {
        let mut report = PlanReport::default();

        for raw in plan.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if cancel.is_cancelled() {
                info!(
                    executed = report.steps.len(),
                    "plan cancelled, stopping before next line"
                );
                report.cancelled = true;
                break;
            }

            info!(command = %line, "plan step");
            let result = self.run_line(line).await;
            info!(
                exit_code = result.exit_code,
                timed_out = result.timed_out,
                "plan step finished"
            );

            report.steps.push(PlanStep {
                command: line.to_string(),
                result,
            });
        }

        report
    }

    /// Run the plan on a dedicated worker task so the caller can poll or
    /// request cancellation without blocking.
    pub fn spawn(self, plan: String) -> PlanHandle {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(&plan, token).await });

        PlanHandle { cancel, task }
    }

    async fn run_line(&self, command: &str) -> ExecutionResult {
        if let Some(filter) = &self.filter
            && !filter.is_safe(command)
        {
            return ExecutionResult::failure("Command blocked by safety deny-list");
        }

        let request = ExecutionRequest::shell(command, self.step_timeout_secs);
        executor::execute(&self.exec_config, &request).await
    }
}

/// Handle to a running plan worker.
pub struct PlanHandle {
    cancel: CancelToken,
    task: JoinHandle<PlanReport>,
}

impl PlanHandle {
    /// Request cooperative stop; the command in flight is not interrupted.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Clone of the worker's cancellation token, for out-of-band stops.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the worker and collect its report.
    pub async fn join(self) -> Result<PlanReport, AgentError> {
        self.task
            .await
            .map_err(|e| AgentError::WorkerFailed(e.to_string()))
    }
}

/// Display formatting for a single command result: stdout, stderr, then
/// `exit_code=N`, empty streams omitted.
pub fn format_result(result: &ExecutionResult) -> String {
    let mut parts = Vec::new();
    if !result.stdout.is_empty() {
        parts.push(result.stdout.trim_end_matches('\n').to_string());
    }
    if !result.stderr.is_empty() {
        parts.push(result.stderr.trim_end_matches('\n').to_string());
    }
    parts.push(format!("exit_code={}", result.exit_code));
    parts.join("\n")
}
