//! Integration tests for process launching and lifecycle tracking
//!
//! These tests run real child processes (`uname`, `sleep`, `sh`, `cat`) and
//! verify the full lifecycle: spawn, stdio wiring, status transitions,
//! timeout semantics, and wait-status classification.

#![cfg(unix)]

use procyon_core::{CommunicationChannel, Process, ProcessDescriptor, ProcessError, Status};
use std::time::Duration;

#[tokio::test]
async fn test_launch_by_name_with_piped_stdout() {
    let mut process = Process::by_name("uname");
    process.stdout = Some(CommunicationChannel::pipe().expect("pipe"));
    process.launch().expect("launch");

    let status = process.wait_until_exit().await.expect("wait");
    assert_eq!(status, Status::Exited(0));

    let result = process.stdout.as_ref().expect("stdout").read_all_text();
    assert_eq!(result, "Linux");
}

#[tokio::test]
async fn test_launch_by_path_with_piped_stdout() {
    let mut process = Process::by_path("/bin/uname");
    process.stdout = Some(CommunicationChannel::pipe().expect("pipe"));
    process.launch().expect("launch");

    process.wait_until_exit().await.expect("wait");

    let result = process.stdout.as_ref().expect("stdout").read_all_text();
    assert_eq!(result, "Linux");
}

#[tokio::test]
async fn test_status_lifecycle() {
    let mut process = Process::new(ProcessDescriptor::by_name("sleep").args(["0.2"]));
    assert_eq!(process.status(), Status::Created);

    process.launch().expect("launch");
    assert_eq!(process.status(), Status::Running);

    let status = process.wait_until_exit().await.expect("wait");
    assert_eq!(status, Status::Exited(0));
}

#[test]
fn test_launch_twice_fails() {
    let mut process = Process::new(ProcessDescriptor::by_name("sleep").args(["0.2"]));
    process.launch().expect("first launch");

    let second = process.launch();
    assert!(matches!(second, Err(ProcessError::AlreadyLaunched)));

    // still running and reapable after the refused relaunch
    loop {
        if process.refresh().expect("refresh") {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(process.cached_status(), Status::Exited(0));
}

#[tokio::test]
async fn test_launch_after_exit_fails() {
    let mut process = Process::by_name("true");
    process.launch().expect("launch");
    process.wait_until_exit().await.expect("wait");

    assert!(matches!(process.launch(), Err(ProcessError::AlreadyLaunched)));
}

#[tokio::test]
async fn test_wait_timeout_leaves_child_running() {
    let mut process = Process::new(ProcessDescriptor::by_name("sleep").args(["1"]));
    process.launch().expect("launch");

    let result = process.wait_timeout(Duration::from_millis(100)).await;
    assert!(matches!(result, Err(ProcessError::Timeout)));

    // not incorrectly reaped: the child is still running
    assert_eq!(process.cached_status(), Status::Running);

    // and can still be waited on to completion afterwards
    let status = process.wait_until_exit().await.expect("wait");
    assert_eq!(status, Status::Exited(0));
}

#[tokio::test]
async fn test_terminal_status_is_idempotent() {
    let mut process = Process::by_name("uname");
    process.stdout = Some(CommunicationChannel::pipe().expect("pipe"));
    process.launch().expect("launch");

    let first = process.wait_until_exit().await.expect("wait");
    let second = process.status();
    let third = process.status();
    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[tokio::test]
async fn test_exit_code_propagates() {
    let mut process = Process::new(ProcessDescriptor::by_name("sh").args(["-c", "exit 3"]));
    process.launch().expect("launch");

    let status = process.wait_until_exit().await.expect("wait");
    assert_eq!(status, Status::Exited(3));
}

#[tokio::test]
async fn test_signal_termination_classified() {
    let mut process = Process::new(ProcessDescriptor::by_name("sleep").args(["30"]));
    process.launch().expect("launch");

    let pid = process.pid().expect("pid") as i32;
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), nix::sys::signal::Signal::SIGKILL)
        .expect("kill");

    let status = process.wait_until_exit().await.expect("wait");
    assert_eq!(status, Status::Signaled(9));
}

#[tokio::test]
async fn test_stderr_pipe() {
    let mut process =
        Process::new(ProcessDescriptor::by_name("sh").args(["-c", "echo oops >&2"]));
    process.stderr = Some(CommunicationChannel::pipe().expect("pipe"));
    process.launch().expect("launch");

    process.wait_until_exit().await.expect("wait");

    let result = process.stderr.as_ref().expect("stderr").read_all_text();
    assert_eq!(result, "oops");
}

#[tokio::test]
async fn test_stdin_pipe_feeds_child() {
    let mut process = Process::by_name("cat");
    process.stdin = Some(CommunicationChannel::pipe().expect("pipe"));
    process.stdout = Some(CommunicationChannel::pipe().expect("pipe"));
    process.launch().expect("launch");

    if let Some(CommunicationChannel::Pipe(pipe)) = process.stdin.as_mut() {
        pipe.write_all(b"hello\n").expect("write");
        pipe.close_write();
    } else {
        panic!("stdin should be a pipe");
    }

    let status = process.wait_until_exit().await.expect("wait");
    assert_eq!(status, Status::Exited(0));

    let result = process.stdout.as_ref().expect("stdout").read_all_text();
    assert_eq!(result, "hello");
}

#[tokio::test]
async fn test_file_redirection_matches_piped_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    std::fs::write(&input, b"").expect("create input");

    let mut piped = Process::by_name("uname");
    piped.stdout = Some(CommunicationChannel::pipe().expect("pipe"));
    piped.launch().expect("launch piped");
    piped.wait_until_exit().await.expect("wait piped");
    let piped_text = piped.stdout.as_ref().expect("stdout").read_all_text();

    let mut redirected = Process::by_name("uname");
    redirected.stdin = Some(CommunicationChannel::file(&input));
    redirected.stdout = Some(CommunicationChannel::file(&output));
    redirected.launch().expect("launch redirected");
    redirected.wait_until_exit().await.expect("wait redirected");
    let redirected_text = redirected.stdout.as_ref().expect("stdout").read_all_text();

    assert_eq!(redirected_text, piped_text);
    assert_eq!(redirected_text, "Linux");
}

#[tokio::test]
async fn test_environment_injection() {
    let descriptor = ProcessDescriptor::by_name("sh")
        .args(["-c", "printf '%s' \"$PROCYON_TEST_ENV\""])
        .env("PROCYON_TEST_ENV", "injected");
    let mut process = Process::new(descriptor);
    process.stdout = Some(CommunicationChannel::pipe().expect("pipe"));
    process.launch().expect("launch");

    process.wait_until_exit().await.expect("wait");

    let result = process.stdout.as_ref().expect("stdout").read_all_text();
    assert_eq!(result, "injected");
}

#[tokio::test]
async fn test_working_directory_placement() {
    let dir = tempfile::tempdir().expect("tempdir");
    let expected = std::fs::canonicalize(dir.path()).expect("canonicalize");

    let mut process =
        Process::new(ProcessDescriptor::by_name("sh").args(["-c", "pwd"]).current_dir(dir.path()));
    process.stdout = Some(CommunicationChannel::pipe().expect("pipe"));
    process.launch().expect("launch");

    process.wait_until_exit().await.expect("wait");

    let reported = process.stdout.as_ref().expect("stdout").read_all_text();
    let reported = std::fs::canonicalize(&reported).expect("canonicalize output");
    assert_eq!(reported, expected);
}

#[tokio::test]
async fn test_available_data_while_running() {
    let mut process = Process::new(
        ProcessDescriptor::by_name("sh").args(["-c", "printf early; sleep 2; printf late"]),
    );
    process.stdout = Some(CommunicationChannel::pipe().expect("pipe"));
    process.launch().expect("launch");

    // give the child time to emit the first chunk, then drain incrementally
    let mut collected = Vec::new();
    for _ in 0..20 {
        collected.extend(process.stdout.as_ref().expect("stdout").available_data());
        if !collected.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(collected, b"early");
    assert_eq!(process.status(), Status::Running);

    process.wait_until_exit().await.expect("wait");
    let rest = process.stdout.as_ref().expect("stdout").read_all_text();
    assert_eq!(rest, "late");
}

#[tokio::test]
async fn test_spawn_failure_reports_system_error() {
    let mut process = Process::by_path("/nonexistent/procyon-no-such-binary");
    let result = process.launch();
    assert!(matches!(result, Err(ProcessError::System(_))));

    // a failed spawn never advances the state machine
    assert_eq!(process.cached_status(), Status::Created);
}
