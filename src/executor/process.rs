// Subprocess execution engine

use crate::executor::config::ExecutorConfig;
use crate::executor::types::{
    ExecutionKind, ExecutionRequest, ExecutionResult, Language, SNIPPET_STREAM_CAP,
};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Execute a single request and produce exactly one result.
///
/// Spawn failures, IO failures and timeouts are all folded into the
/// `ExecutionResult`; this function never returns an error. The child is
/// always reaped: on timeout it is killed and waited, and `kill_on_drop` is
/// set as a backstop for cancellation of the surrounding task.
pub async fn execute(config: &ExecutorConfig, request: &ExecutionRequest) -> ExecutionResult {
    let start = Instant::now();
    let mut command = build_command(config, request);

    debug!(
        kind = ?request.kind,
        timeout_secs = request.timeout_secs,
        "spawning subprocess"
    );

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(error = %e, kind = ?request.kind, "failed to spawn subprocess");
            return ExecutionResult::failure(e.to_string());
        }
    };

    // Snippets arrive on stdin, never on the argv line. Closing the pipe
    // signals EOF so the interpreter starts executing.
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(request.payload.as_bytes()).await {
            warn!(error = %e, "failed to write snippet to stdin");
        }
        drop(stdin);
    }

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    // Drain both pipes concurrently, then reap. Sequential reads could
    // deadlock once one pipe's buffer fills.
    let wait = async {
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        tokio::join!(
            async {
                if let Some(pipe) = stdout_pipe.as_mut() {
                    let _ = pipe.read_to_end(&mut stdout_buf).await;
                }
            },
            async {
                if let Some(pipe) = stderr_pipe.as_mut() {
                    let _ = pipe.read_to_end(&mut stderr_buf).await;
                }
            },
        );
        let status = child.wait().await;
        (status, stdout_buf, stderr_buf)
    };

    match timeout(Duration::from_secs(request.timeout_secs), wait).await {
        Ok((Ok(status), stdout_buf, stderr_buf)) => {
            let exit_code = status.code().unwrap_or(-1);
            let result = ExecutionResult::from_output(
                String::from_utf8_lossy(&stdout_buf).into_owned(),
                String::from_utf8_lossy(&stderr_buf).into_owned(),
                exit_code,
                stream_cap(request.kind),
            );

            info!(
                kind = ?request.kind,
                exit_code = exit_code,
                duration_ms = start.elapsed().as_millis() as u64,
                stdout_bytes = result.stdout.len(),
                stderr_bytes = result.stderr.len(),
                "subprocess completed"
            );
            result
        }
        Ok((Err(e), _, _)) => {
            warn!(error = %e, "failed to collect subprocess status");
            ExecutionResult::failure(e.to_string())
        }
        Err(_) => {
            warn!(
                kind = ?request.kind,
                timeout_secs = request.timeout_secs,
                "subprocess exceeded time budget, killing"
            );
            let _ = child.start_kill();
            let _ = child.wait().await;
            ExecutionResult::timeout()
        }
    }
}

fn build_command(config: &ExecutorConfig, request: &ExecutionRequest) -> Command {
    let mut command = match request.kind {
        ExecutionKind::Shell => {
            let mut c = Command::new(&config.shell);
            c.arg("-c").arg(&request.payload);
            // Shell commands never read from the terminal.
            c.stdin(Stdio::null());
            c
        }
        ExecutionKind::Code(Language::Python) => {
            let mut c = Command::new(&config.python_bin);
            // -I: isolated mode, no user site-packages or env hooks.
            c.args(["-I", "-"]);
            c.stdin(Stdio::piped());
            c
        }
        ExecutionKind::Code(Language::Javascript) => {
            let mut c = Command::new(&config.node_bin);
            c.args(["--input-type=module", "-"]);
            c.stdin(Stdio::piped());
            c
        }
    };

    if let Some(dir) = &config.working_dir {
        command.current_dir(dir);
    }

    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

fn stream_cap(kind: ExecutionKind) -> Option<usize> {
    match kind {
        ExecutionKind::Shell => None,
        ExecutionKind::Code(_) => Some(SNIPPET_STREAM_CAP),
    }
}
