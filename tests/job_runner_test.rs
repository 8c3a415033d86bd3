#![cfg(unix)]

mod common;

use common::Fixture;
use report_orchestrator::models::ALREADY_PROCESSED_MARKER;
use report_orchestrator::{BatchJobRunner, JobOutcome, JobRequest};
use std::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_exit_zero_succeeds_with_output() {
    let fixture = Fixture::new();
    let result = fixture
        .runner("echo 开始处理; echo 处理完成")
        .run(&JobRequest::default())
        .await;

    assert_eq!(result.outcome, JobOutcome::Succeeded);
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.output, "开始处理\n处理完成\n");
    assert_eq!(result.error, None);
}

#[tokio::test]
async fn test_nonzero_exit_carries_stderr() {
    let fixture = Fixture::new();
    let result = fixture
        .runner("echo partial; echo 'Traceback: boom' >&2; exit 1")
        .run(&JobRequest::default())
        .await;

    assert_eq!(result.outcome, JobOutcome::Failed);
    assert_eq!(result.exit_code, Some(1));
    assert_eq!(result.output, "partial\n");
    assert_eq!(result.error.as_deref(), Some("Traceback: boom\n"));
}

#[tokio::test]
async fn test_killed_with_marker_counts_as_success() {
    let fixture = Fixture::new();
    let script = format!("echo '{}，跳过'; kill -9 $$", ALREADY_PROCESSED_MARKER);
    let result = fixture.runner(&script).run(&JobRequest::default()).await;

    assert_eq!(result.outcome, JobOutcome::Succeeded);
    assert_eq!(result.exit_code, Some(0));
    assert!(result.output.contains(ALREADY_PROCESSED_MARKER));
}

#[tokio::test]
async fn test_killed_without_marker_fails() {
    let fixture = Fixture::new();
    let result = fixture
        .runner("echo working; kill -9 $$")
        .run(&JobRequest::default())
        .await;

    assert_eq!(result.outcome, JobOutcome::Failed);
    assert_eq!(result.exit_code, None);
}

#[tokio::test]
async fn test_timeout_kills_and_keeps_partial_output() {
    let fixture = Fixture::new();
    let runner = fixture
        .runner("echo started; exec sleep 30")
        .with_timeout(Duration::from_millis(500));

    let started = Instant::now();
    let result = runner.run(&JobRequest::default()).await;

    assert_eq!(result.outcome, JobOutcome::TimedOut);
    assert_eq!(result.exit_code, None);
    assert!(result.output.contains("started"));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_environment_overlay_only_when_present() {
    let fixture = Fixture::new();
    let script = r#"printf '%s|%s' "${EXAM_NAME-unset}" "${TEACHER_USERNAME-unset}""#;

    let with_values = fixture
        .runner(script)
        .run(&JobRequest::new(Some("期中".into()), Some("t1".into())))
        .await;
    assert_eq!(with_values.output, "期中|t1");

    let blank = fixture
        .runner(script)
        .run(&JobRequest::new(Some("   ".into()), None))
        .await;
    assert_eq!(blank.output, "unset|unset");
}

#[tokio::test]
async fn test_multibyte_output_survives_chunking() {
    let fixture = Fixture::new();
    // 18000 字节，超过单次读取的缓冲区
    let result = fixture
        .runner("i=0; while [ $i -lt 3000 ]; do printf '检测'; i=$((i+1)); done")
        .run(&JobRequest::default())
        .await;

    assert!(result.succeeded());
    assert_eq!(result.output.chars().count(), 6000);
    assert!(!result.output.contains('\u{FFFD}'));
}

#[tokio::test]
async fn test_missing_program_is_launch_failure() {
    let fixture = Fixture::new();
    let runner = BatchJobRunner::with_command(
        "/nonexistent/python3",
        vec!["main.py".to_string()],
        fixture.layout.project_root(),
    );

    let result = runner.run(&JobRequest::default()).await;

    assert_eq!(result.outcome, JobOutcome::LaunchFailed);
    assert!(result.error.is_some());
    assert_eq!(result.exit_code, None);
}

#[tokio::test]
async fn test_api_reports_failed_job_as_response() {
    let fixture = Fixture::new();
    let api = fixture.api("echo 'bad input' >&2; exit 1");

    let response = assert_ok!(api.run_job(&JobRequest::default()).await);

    assert!(!response.success);
    assert_eq!(response.outcome, JobOutcome::Failed);
    assert_eq!(response.error.as_deref(), Some("bad input\n"));
    assert_eq!(response.exit_code, Some(1));
}

#[tokio::test]
async fn test_api_launch_failure_is_error() {
    let fixture = Fixture::new();
    let api = report_orchestrator::ReportApi::from_parts(
        fixture.layout.clone(),
        BatchJobRunner::with_command("/nonexistent/python3", vec![], fixture.layout.project_root()),
        fixture.extractor(),
        9,
        "grammar_table",
    );

    let err = assert_err!(api.run_job(&JobRequest::default()).await);
    assert_eq!(err.status_code(), 500);
}
