// Integration tests for the plan runner
// Run with: cargo test --test test_agent

use kimi_agent::agent::{CancelToken, PlanRunner};
use kimi_agent::executor::{ExecutorConfig, SafetyFilter};
use std::time::Duration;

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .init();
    });
}

fn runner(filtered: bool) -> PlanRunner {
    let filter = filtered.then(SafetyFilter::new);
    PlanRunner::new(ExecutorConfig::default(), 10, filter)
}

/// Blank lines and comments are skipped; real lines run top to bottom
#[tokio::test]
async fn test_plan_skips_blanks_and_comments() {
    init_tracing();

    let plan = "echo A\n# a comment\n\necho B\n";
    let report = runner(true).run(plan, CancelToken::new()).await;

    assert!(!report.cancelled);
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].command, "echo A");
    assert_eq!(report.steps[0].result.stdout, "A\n");
    assert_eq!(report.steps[1].command, "echo B");
    assert_eq!(report.steps[1].result.stdout, "B\n");
}

/// A blocked line is recorded as rejected and the plan continues
#[tokio::test]
async fn test_blocked_line_is_recorded_and_plan_continues() {
    init_tracing();

    let plan = "echo before\necho format\necho after";
    let report = runner(true).run(plan, CancelToken::new()).await;

    assert_eq!(report.steps.len(), 3);
    assert_eq!(report.steps[0].result.exit_code, 0);

    let blocked = &report.steps[1].result;
    assert_eq!(blocked.exit_code, -1);
    assert!(blocked.stderr.contains("blocked"));
    assert!(blocked.stdout.is_empty(), "blocked line must not run");

    assert_eq!(report.steps[2].result.stdout, "after\n");
}

/// With filtering disabled the same line executes normally
#[tokio::test]
async fn test_filter_disabled_runs_everything() {
    init_tracing();

    let report = runner(false).run("echo format", CancelToken::new()).await;

    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.steps[0].result.exit_code, 0);
    assert_eq!(report.steps[0].result.stdout, "format\n");
}

/// A token cancelled up front yields an empty, cancelled report
#[tokio::test]
async fn test_cancel_before_first_step() {
    init_tracing();

    let cancel = CancelToken::new();
    cancel.cancel();

    let report = runner(true).run("echo never", cancel).await;

    assert!(report.cancelled);
    assert!(report.steps.is_empty());
}

/// stop() lets the step in flight finish, then halts before the next line
#[tokio::test]
async fn test_stop_mid_plan() {
    init_tracing();

    let plan = "echo first\nsleep 1\necho last\n".to_string();
    let handle = runner(true).spawn(plan);

    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.stop();

    let report = handle.join().await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.steps.len(), 2, "sleep finishes, echo last never starts");
    assert!(report.steps[0].result.stdout.contains("first"));
    assert!(report.steps.iter().all(|s| s.command != "echo last"));
}

#[tokio::test]
async fn test_run_command_formatting() {
    init_tracing();

    let output = runner(true).run_command("echo hi").await;

    assert!(output.contains("hi"));
    assert!(output.contains("exit_code=0"));
}

#[tokio::test]
async fn test_run_command_blocked() {
    init_tracing();

    let output = runner(true).run_command("sudo rm -rf /tmp/scratch").await;

    assert!(output.contains("blocked"));
    assert!(output.contains("exit_code=-1"));
}
