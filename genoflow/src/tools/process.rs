//! External process execution.

use super::adapter::ToolCommand;
use super::outcome::{tail_lines, ToolFailure, ToolOutcome};
use crate::cancellation::CancellationToken;
use crate::core::{Artifact, FileCheck};
use std::future::Future;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

enum Waited {
    Exited(std::io::Result<Output>),
    TimedOut(Duration),
    Aborted(String),
}

/// Runs a tool command to completion.
///
/// The child is killed when the timeout elapses or the run is cancelled.
/// Combined output is written to `log_path`; the outcome carries the last
/// `tail` lines of stderr. A zero exit only counts as success when every
/// declared output exists and is non-empty.
pub async fn execute(
    tool: &str,
    command: &ToolCommand,
    log_path: &Path,
    tail: usize,
    cancel: &CancellationToken,
) -> ToolOutcome {
    let started = Instant::now();
    if let Some(reason) = cancel.reason() {
        return ToolOutcome::failed(tool, ToolFailure::Aborted(reason));
    }

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = log_path.parent() {
        cmd.current_dir(dir);
    }

    debug!(tool, command = %command.display(), "Starting tool");
    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            let failure = ToolFailure::Spawn(format!("{}: {e}", command.program.display()));
            write_log(log_path, command, None, &failure.to_string()).await;
            return ToolOutcome::failed(tool, failure).with_duration(started.elapsed());
        }
    };

    let waited = tokio::select! {
        waited = wait_bounded(child.wait_with_output(), command.timeout) => waited,
        () = cancel.cancelled() => Waited::Aborted(cancel.reason().unwrap_or_default()),
    };

    let outcome = match waited {
        Waited::Exited(Ok(output)) => {
            write_log(log_path, command, Some(&output), "").await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            let outcome = match status_failure(output.status) {
                Some(failure) => ToolOutcome::failed(tool, failure),
                None => verify_outputs(tool, &command.declared_outputs),
            };
            outcome
                .with_exit_code(output.status.code())
                .with_stderr_tail(tail_lines(&stderr, tail))
        }
        Waited::Exited(Err(e)) => {
            let failure = ToolFailure::Spawn(e.to_string());
            write_log(log_path, command, None, &failure.to_string()).await;
            ToolOutcome::failed(tool, failure)
        }
        Waited::TimedOut(limit) => {
            warn!(tool, timeout_secs = limit.as_secs(), "Tool timed out, killed");
            let failure = ToolFailure::Timeout(limit);
            write_log(log_path, command, None, &failure.to_string()).await;
            ToolOutcome::failed(tool, failure)
        }
        Waited::Aborted(reason) => {
            warn!(tool, %reason, "Run aborted, tool killed");
            let failure = ToolFailure::Aborted(reason);
            write_log(log_path, command, None, &failure.to_string()).await;
            ToolOutcome::failed(tool, failure)
        }
    };
    outcome.with_duration(started.elapsed())
}

async fn wait_bounded<F>(wait: F, timeout: Option<Duration>) -> Waited
where
    F: Future<Output = std::io::Result<Output>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, wait).await {
            Ok(result) => Waited::Exited(result),
            Err(_) => Waited::TimedOut(limit),
        },
        None => Waited::Exited(wait.await),
    }
}

fn status_failure(status: ExitStatus) -> Option<ToolFailure> {
    match status.code() {
        Some(0) => None,
        Some(code) => Some(ToolFailure::NonZeroExit(code)),
        None => Some(ToolFailure::TerminatedBySignal(signal_of(status))),
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}

/// Checks that every declared output exists and is non-empty.
///
/// Returns a successful outcome carrying `declared` when they all do, or a
/// failure naming the first defective file.
#[must_use]
pub fn verify_outputs(tool: &str, declared: &[Artifact]) -> ToolOutcome {
    for artifact in declared {
        if let Some((path, check)) = artifact.first_defect() {
            let failure = match check {
                FileCheck::Empty => ToolFailure::EmptyArtifact(path.to_path_buf()),
                _ => ToolFailure::MissingArtifact(path.to_path_buf()),
            };
            return ToolOutcome::failed(tool, failure);
        }
    }
    ToolOutcome::success(tool, declared.to_vec())
}

async fn write_log(path: &Path, command: &ToolCommand, output: Option<&Output>, note: &str) {
    let mut log = format!("$ {}\n", command.display());
    if let Some(output) = output {
        log.push_str("--- stdout ---\n");
        log.push_str(&String::from_utf8_lossy(&output.stdout));
        log.push_str("\n--- stderr ---\n");
        log.push_str(&String::from_utf8_lossy(&output.stderr));
        log.push_str(&format!("\n--- exit: {} ---\n", output.status));
    }
    if !note.is_empty() {
        log.push_str(note);
        log.push('\n');
    }
    if let Err(e) = tokio::fs::write(path, log).await {
        warn!(path = %path.display(), error = %e, "Failed to write tool log");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::{Artifact, ArtifactKind};
    use std::sync::Arc;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("/bin/sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_success_with_declared_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("contigs.fasta");
        let command = sh("printf '>c1\\nACGT\\n' > contigs.fasta")
            .output(Artifact::single(ArtifactKind::Contigs, &out));
        let log = dir.path().join("spades.log");

        let outcome = execute("spades", &command, &log, 20, &CancellationToken::new()).await;

        assert!(outcome.is_success(), "{:?}", outcome.failure);
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.produced, vec![Artifact::single(ArtifactKind::Contigs, &out)]);
        assert!(std::fs::read_to_string(&log).unwrap().starts_with("$ /bin/sh -c"));
    }

    #[tokio::test]
    async fn test_zero_exit_with_empty_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("contigs.fasta");
        let command =
            sh(": > contigs.fasta").output(Artifact::single(ArtifactKind::Contigs, &out));

        let outcome = execute(
            "spades",
            &command,
            &dir.path().join("spades.log"),
            20,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.failure, Some(ToolFailure::EmptyArtifact(out)));
        assert!(outcome.produced.is_empty());
    }

    #[tokio::test]
    async fn test_zero_exit_with_missing_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.tsv");
        let command = sh("true").output(Artifact::single(ArtifactKind::AssemblyReport, &out));

        let outcome = execute(
            "quast",
            &command,
            &dir.path().join("quast.log"),
            20,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.failure, Some(ToolFailure::MissingArtifact(out)));
    }

    #[tokio::test]
    async fn test_non_zero_exit_keeps_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let command = sh("echo one >&2; echo two >&2; echo three >&2; exit 3");

        let outcome = execute(
            "trimmomatic",
            &command,
            &dir.path().join("trimmomatic.log"),
            2,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.failure, Some(ToolFailure::NonZeroExit(3)));
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stderr_tail, "two\nthree");
        assert!(outcome.reason().unwrap().starts_with("trimmomatic exited with status 3"));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let command = ToolCommand::new(dir.path().join("no-such-tool"));

        let outcome = execute(
            "prokka",
            &command,
            &dir.path().join("prokka.log"),
            20,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(outcome.failure, Some(ToolFailure::Spawn(_))));
        assert_eq!(outcome.exit_code, None);
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let command = sh("sleep 30").timeout(Some(Duration::from_millis(100)));

        let started = Instant::now();
        let outcome = execute(
            "fastqc",
            &command,
            &dir.path().join("fastqc.log"),
            20,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(
            outcome.failure,
            Some(ToolFailure::Timeout(Duration::from_millis(100)))
        );
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_aborts_running_process() {
        let dir = tempfile::tempdir().unwrap();
        let token = Arc::new(CancellationToken::new());
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                token.cancel("operator interrupt");
            })
        };

        let outcome = execute(
            "spades",
            &sh("sleep 30"),
            &dir.path().join("spades.log"),
            20,
            &token,
        )
        .await;
        canceller.await.unwrap();

        assert_eq!(
            outcome.failure,
            Some(ToolFailure::Aborted("operator interrupt".to_string()))
        );
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        token.cancel("run timeout");
        let marker = dir.path().join("ran");

        let outcome = execute(
            "spades",
            &sh(&format!("touch {}", marker.display())),
            &dir.path().join("spades.log"),
            20,
            &token,
        )
        .await;

        assert!(matches!(outcome.failure, Some(ToolFailure::Aborted(_))));
        assert!(!marker.exists());
    }
}
