use std::{
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::{Child, Command},
    time::Instant,
};

use super::result::CaseStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecLimits {
    pub timeout: Duration,
    /// Cap applied to stdout and stderr separately.
    pub max_output_bytes: usize,
}

impl ExecLimits {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);
    pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 512 * 1024 * 1024;
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            max_output_bytes: Self::DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecStatus {
    OK,
    TLE,
    MLE,
    RE,
}

impl From<ExecStatus> for CaseStatus {
    fn from(s: ExecStatus) -> Self {
        match s {
            ExecStatus::OK => CaseStatus::OK,
            ExecStatus::TLE => CaseStatus::TLE,
            ExecStatus::MLE => CaseStatus::MLE,
            ExecStatus::RE => CaseStatus::RE,
        }
    }
}

/// Derives the terminal status of a limited run.
///
/// `killed_by_limit` means the executor itself delivered the kill signal (deadline or
/// output cap), `output_overflow` means a stream went over its cap.
pub fn classify(killed_by_limit: bool, output_overflow: bool, exit_code: Option<i32>) -> ExecStatus {
    match (killed_by_limit, output_overflow, exit_code) {
        (true, true, _) => ExecStatus::MLE,
        (true, false, _) => ExecStatus::TLE,
        (false, true, _) => ExecStatus::MLE,
        (false, false, Some(0)) => ExecStatus::OK,
        (false, false, _) => ExecStatus::RE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    /// Always 0: memory is not metered.
    pub memory_kb: u64,
    pub status: ExecStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub spawn_error: Option<String>,
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs `program` with `input` on stdin under `limits`. Never fails: every
    /// outcome, including a failed spawn, is folded into the returned status.
    async fn run_with_limits(&self, program: &Path, input: &str, limits: &ExecLimits)
        -> ExecOutput;

    /// Runs `program` to completion with stdin closed and no limits.
    async fn run_raw(&self, program: &Path, args: &[&OsStr]) -> RawOutput;
}

#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    launcher: Option<PathBuf>,
}

enum Flow {
    Exited(ExitStatus),
    Overflow,
}

#[derive(Default)]
struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ProcessExecutor {
    const CHUNK_SIZE: usize = 8192;

    pub fn new() -> Self {
        Self::default()
    }

    /// Starts every program as `<launcher> <program> [args...]`, e.g. `/bin/sh` for scripts.
    pub fn launcher(mut self, launcher: impl Into<PathBuf>) -> Self {
        self.launcher = Some(launcher.into());
        self
    }

    fn command(&self, program: &Path) -> Command {
        match &self.launcher {
            Some(launcher) => {
                let mut cmd = Command::new(launcher);
                cmd.arg(program);
                cmd
            }
            None => Command::new(program),
        }
    }

    fn feed_stdin(child: &mut Child, input: &str) {
        let Some(mut stdin) = child.stdin.take() else {
            return
        };
        let input = input.to_owned();
        tokio::spawn(async move {
            // The child may exit without reading everything; a broken pipe is fine.
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                log::debug!("stdin closed early: {}", e);
            }
        });
    }

    async fn communicate(
        child: &mut Child,
        captured: &mut Captured,
        max_output_bytes: usize,
    ) -> io::Result<Flow> {
        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(io::Error::new(io::ErrorKind::Other, "child output is not piped"))
        };

        let mut out_chunk = [0u8; Self::CHUNK_SIZE];
        let mut err_chunk = [0u8; Self::CHUNK_SIZE];
        let (mut out_open, mut err_open) = (true, true);

        while out_open || err_open {
            tokio::select! {
                n = stdout.read(&mut out_chunk), if out_open => {
                    let n = n?;
                    if n == 0 {
                        out_open = false;
                    } else {
                        captured.stdout.extend_from_slice(&out_chunk[..n]);
                        if captured.stdout.len() > max_output_bytes {
                            return Ok(Flow::Overflow);
                        }
                    }
                }
                n = stderr.read(&mut err_chunk), if err_open => {
                    let n = n?;
                    if n == 0 {
                        err_open = false;
                    } else {
                        captured.stderr.extend_from_slice(&err_chunk[..n]);
                        if captured.stderr.len() > max_output_bytes {
                            return Ok(Flow::Overflow);
                        }
                    }
                }
            }
        }
        child.wait().await.map(Flow::Exited)
    }

    async fn kill(child: &mut Child) {
        child
            .kill()
            .await
            .unwrap_or_else(|e| log::warn!("Failed to kill process: {:#}", e));
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    /// The run ends when both output pipes are closed, not when the program exits:
    /// a background child still holding stdout keeps it going until the deadline.
    async fn run_with_limits(
        &self,
        program: &Path,
        input: &str,
        limits: &ExecLimits,
    ) -> ExecOutput {
        log::debug!("Running {:?} (limits: {:?})", program, limits);

        let start_at = Instant::now();
        let spawned = self
            .command(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                return ExecOutput {
                    stdout: String::new(),
                    stderr: format!("Failed to spawn '{}': {}", program.to_string_lossy(), e),
                    duration: start_at.elapsed(),
                    memory_kb: 0,
                    status: ExecStatus::RE,
                }
            }
        };

        Self::feed_stdin(&mut child, input);

        let mut captured = Captured::default();
        let res = tokio::time::timeout(
            limits.timeout,
            Self::communicate(&mut child, &mut captured, limits.max_output_bytes),
        )
        .await;

        let (killed_by_limit, output_overflow, exit_code) = match res {
            Err(_) => {
                Self::kill(&mut child).await;
                (true, false, None)
            }
            Ok(Ok(Flow::Overflow)) => {
                Self::kill(&mut child).await;
                (true, true, None)
            }
            Ok(Ok(Flow::Exited(status))) => (false, false, status.code()),
            Ok(Err(e)) => {
                Self::kill(&mut child).await;
                let msg = format!("Failed to communicate with subprocess: {}", e);
                captured.stderr.extend_from_slice(msg.as_bytes());
                (false, false, None)
            }
        };
        let duration = start_at.elapsed();

        ExecOutput {
            stdout: String::from_utf8_lossy(&captured.stdout).into(),
            stderr: String::from_utf8_lossy(&captured.stderr).into(),
            duration,
            memory_kb: 0,
            status: classify(killed_by_limit, output_overflow, exit_code),
        }
    }

    async fn run_raw(&self, program: &Path, args: &[&OsStr]) -> RawOutput {
        log::debug!("Running {:?} {:?}", program, args);

        let output = self
            .command(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(out) => RawOutput {
                stdout: String::from_utf8_lossy(&out.stdout).into(),
                stderr: String::from_utf8_lossy(&out.stderr).into(),
                exit_code: out.status.code(),
                signal: terminating_signal(&out.status),
                spawn_error: None,
            },
            Err(e) => RawOutput {
                spawn_error: Some(format!(
                    "Failed to spawn '{}': {}",
                    program.to_string_lossy(),
                    e
                )),
                ..Default::default()
            },
        }
    }
}

#[cfg(unix)]
fn terminating_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn terminating_signal(_: &ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::{scratch_dir, write_script};

    #[test]
    fn classify_follows_priority_order() {
        use ExecStatus::*;

        struct X {
            killed: bool,
            overflow: bool,
            code: Option<i32>,
            want: ExecStatus,
        }
        let table = [
            // killed on the output cap
            X { killed: true, overflow: true, code: None, want: MLE },
            // killed on the deadline
            X { killed: true, overflow: false, code: None, want: TLE },
            // overflow reported without a kill
            X { killed: false, overflow: true, code: Some(0), want: MLE },
            X { killed: false, overflow: false, code: Some(0), want: OK },
            X { killed: false, overflow: false, code: Some(1), want: RE },
            X { killed: false, overflow: false, code: None, want: RE },
            // overlap: both limits fired and the process still managed to exit 0
            X { killed: true, overflow: true, code: Some(0), want: MLE },
            X { killed: true, overflow: false, code: Some(0), want: TLE },
        ];
        for x in table {
            assert_eq!(
                classify(x.killed, x.overflow, x.code),
                x.want,
                "killed={} overflow={} code={:?}",
                x.killed,
                x.overflow,
                x.code
            );
        }
    }

    fn sh() -> ProcessExecutor {
        ProcessExecutor::new().launcher("/bin/sh")
    }

    fn limits(timeout_ms: u64, max_output_bytes: usize) -> ExecLimits {
        ExecLimits {
            timeout: Duration::from_millis(timeout_ms),
            max_output_bytes,
        }
    }

    #[tokio::test]
    async fn should_be_ok_and_echo_stdin() {
        let dir = scratch_dir();
        let prog = write_script(&dir, "cat.sh", "cat");
        let res = sh().run_with_limits(&prog, "hello 123\n", &ExecLimits::default()).await;
        assert_eq!(res.status, ExecStatus::OK);
        assert_eq!(res.stdout, "hello 123\n");
        assert_eq!(res.stderr, "");
        assert_eq!(res.memory_kb, 0);
        fsutil::remove_dir_all_if_exists(&dir).unwrap();
    }

    #[tokio::test]
    async fn should_be_ok_even_if_stdin_is_not_read() {
        let dir = scratch_dir();
        let prog = write_script(&dir, "hi.sh", "echo hi");
        let big_input = "x".repeat(4 * 1024 * 1024);
        let res = sh().run_with_limits(&prog, &big_input, &ExecLimits::default()).await;
        assert_eq!(res.status, ExecStatus::OK);
        assert_eq!(res.stdout, "hi\n");
        fsutil::remove_dir_all_if_exists(&dir).unwrap();
    }

    #[tokio::test]
    async fn stderr_is_captured_without_changing_status() {
        let dir = scratch_dir();
        let prog = write_script(&dir, "warn.sh", "echo 42; echo oops >&2");
        let res = sh().run_with_limits(&prog, "", &ExecLimits::default()).await;
        assert_eq!(res.status, ExecStatus::OK);
        assert_eq!(res.stdout, "42\n");
        assert_eq!(res.stderr, "oops\n");
        fsutil::remove_dir_all_if_exists(&dir).unwrap();
    }

    #[tokio::test]
    async fn should_be_re_on_nonzero_exit() {
        let dir = scratch_dir();
        let prog = write_script(&dir, "fail.sh", "echo partial; exit 3");
        let res = sh().run_with_limits(&prog, "", &ExecLimits::default()).await;
        assert_eq!(res.status, ExecStatus::RE);
        assert_eq!(res.stdout, "partial\n");
        fsutil::remove_dir_all_if_exists(&dir).unwrap();
    }

    #[tokio::test]
    async fn should_be_tle() {
        let dir = scratch_dir();
        let prog = write_script(&dir, "slow.sh", "sleep 3");
        let res = sh().run_with_limits(&prog, "", &limits(300, 1024)).await;
        assert_eq!(res.status, ExecStatus::TLE);
        assert!(res.duration >= Duration::from_millis(300));
        assert!(res.duration < Duration::from_millis(2500), "{:?}", res.duration);
        fsutil::remove_dir_all_if_exists(&dir).unwrap();
    }

    #[tokio::test]
    async fn should_be_mle_when_output_exceeds_cap() {
        let dir = scratch_dir();
        let prog = write_script(&dir, "flood.sh", "while :; do echo aaaaaaaaaaaaaaaa; done");
        let res = sh().run_with_limits(&prog, "", &limits(5000, 64 * 1024)).await;
        assert_eq!(res.status, ExecStatus::MLE);
        assert!(res.duration < Duration::from_millis(5000));
        fsutil::remove_dir_all_if_exists(&dir).unwrap();
    }

    #[tokio::test]
    async fn should_be_mle_when_stderr_exceeds_cap() {
        let dir = scratch_dir();
        let prog = write_script(&dir, "noisy.sh", "echo 1; while :; do echo debugdebugdebug >&2; done");
        let res = sh().run_with_limits(&prog, "", &limits(5000, 64 * 1024)).await;
        assert_eq!(res.status, ExecStatus::MLE);
        assert!(res.stderr.len() > 64 * 1024);
        assert!(res.duration < Duration::from_millis(5000));
        fsutil::remove_dir_all_if_exists(&dir).unwrap();
    }

    #[tokio::test]
    async fn keeps_running_while_a_background_child_holds_stdout() {
        let dir = scratch_dir();
        let prog = write_script(&dir, "bg.sh", "sleep 3 & echo 42; exit 0");
        let res = sh().run_with_limits(&prog, "", &limits(500, 1024)).await;
        assert_eq!(res.status, ExecStatus::TLE);
        assert_eq!(res.stdout, "42\n");
        fsutil::remove_dir_all_if_exists(&dir).unwrap();
    }

    #[tokio::test]
    async fn spawn_failure_is_a_runtime_error() {
        let dir = scratch_dir();
        let res = ProcessExecutor::new()
            .run_with_limits(&dir.join("no-such-program"), "", &ExecLimits::default())
            .await;
        assert_eq!(res.status, ExecStatus::RE);
        assert!(res.stderr.starts_with("Failed to spawn"), "{}", res.stderr);
    }

    #[tokio::test]
    async fn run_raw_reports_exit_code_and_args() {
        let dir = scratch_dir();
        let prog = write_script(&dir, "judge.sh", r#"echo "$1" >&2; exit "$2""#);
        for code in [0, 1, 7] {
            let code_str = code.to_string();
            let res = sh()
                .run_raw(&prog, &[OsStr::new("first-arg"), OsStr::new(&code_str)])
                .await;
            assert_eq!(res.exit_code, Some(code));
            assert_eq!(res.stderr, "first-arg\n");
            assert_eq!(res.signal, None);
            assert_eq!(res.spawn_error, None);
        }
        fsutil::remove_dir_all_if_exists(&dir).unwrap();
    }

    #[tokio::test]
    async fn run_raw_reports_spawn_error() {
        let dir = scratch_dir();
        let res = ProcessExecutor::new()
            .run_raw(&dir.join("no-such-checker"), &[])
            .await;
        assert_eq!(res.exit_code, None);
        assert!(res.spawn_error.is_some());
    }
}
