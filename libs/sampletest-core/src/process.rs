/// Process Runner - Local Execution and Exit Classification
///
/// **Core Responsibility:**
/// Run one resolved argument vector with stdin redirected from a file,
/// capture stdout/stderr, and classify how the child terminated.
///
/// **Critical Properties:**
/// - A non-zero exit or a fatal signal is an ordinary `RunResult`, never an
///   error. Only a child that could not be launched at all produces
///   `CoreError::Launch`.
/// - stdout and stderr are drained on two independent tasks joined before
///   the run is considered finished, so a full pipe buffer on one stream
///   can never deadlock the other.
/// - Before the first execution in the process lifetime the stack rlimit is
///   raised to unlimited (deep-recursion solutions inherit it); the syscall
///   runs exactly once, guarded by `Once`.
use std::path::Path;
use std::process::Stdio;
use std::sync::Once;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::error::CoreError;

/// How a child process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Exited with code 0.
    Success,
    /// Exited with a non-zero code.
    Code(i32),
    /// Terminated by a signal.
    Signal(i32),
}

impl ExitKind {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitKind::Success)
    }
}

impl std::fmt::Display for ExitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitKind::Success => write!(f, "exited successfully"),
            ExitKind::Code(code) => write!(f, "exit code {}", code),
            ExitKind::Signal(sig) => {
                write!(f, "terminated by signal {} ({})", sig, signal_name(*sig))
            }
        }
    }
}

/// Best-effort human-readable name for a signal number.
pub fn signal_name(sig: i32) -> &'static str {
    match sig {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        6 => "SIGABRT",
        7 => "SIGBUS",
        8 => "SIGFPE",
        9 => "SIGKILL",
        11 => "SIGSEGV",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        24 => "SIGXCPU",
        25 => "SIGXFSZ",
        _ => "unknown",
    }
}

/// Output capture mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Collect stdout and stderr fully; nothing reaches the console until
    /// the call returns.
    Buffered,
    /// Echo stdout (and optionally stderr) live while still accumulating
    /// the full text for the caller.
    Streamed { echo_stderr: bool },
}

/// Outcome of one process execution. Constructed once, never mutated.
#[derive(Debug)]
pub struct RunResult {
    pub exit: ExitKind,
    pub stdout: String,
    pub stderr: String,
    /// Wall time around spawn..wait only, excluding setup.
    pub elapsed: Duration,
}

static RAISE_STACK_LIMIT: Once = Once::new();

/// Raise the stack size limit to unlimited, once per process.
///
/// Judge solutions routinely recurse hundreds of thousands of frames deep;
/// children inherit the parent's rlimits. Failure is logged and ignored -
/// the run itself may still succeed on shallow inputs.
fn raise_stack_limit() {
    RAISE_STACK_LIMIT.call_once(|| {
        let limit = libc::rlimit {
            rlim_cur: libc::RLIM_INFINITY,
            rlim_max: libc::RLIM_INFINITY,
        };
        let rc = unsafe { libc::setrlimit(libc::RLIMIT_STACK, &limit) };
        if rc != 0 {
            tracing::debug!(
                error = %std::io::Error::last_os_error(),
                "could not raise stack size limit"
            );
        } else {
            tracing::debug!("stack size limit raised to unlimited");
        }
    });
}

/// Execute a resolved argument vector.
///
/// `stdin` is a file opened for reading and connected to the child's
/// standard input; `None` connects the null device (compile steps).
pub async fn execute(
    argv: &[String],
    stdin: Option<&Path>,
    capture: Capture,
) -> Result<RunResult, CoreError> {
    raise_stack_limit();

    let (program, args) = argv.split_first().ok_or_else(|| CoreError::Launch {
        command: String::new(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argument vector"),
    })?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    match stdin {
        Some(path) => {
            cmd.stdin(Stdio::from(std::fs::File::open(path)?));
        }
        None => {
            cmd.stdin(Stdio::null());
        }
    }

    let (echo_stdout, echo_stderr) = match capture {
        Capture::Buffered => (false, false),
        Capture::Streamed { echo_stderr } => (true, echo_stderr),
    };

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| CoreError::Launch {
        command: program.clone(),
        source,
    })?;

    let stdout_pipe = child.stdout.take().expect("stdout requested as piped");
    let stderr_pipe = child.stderr.take().expect("stderr requested as piped");

    let stdout_task = tokio::spawn(drain(stdout_pipe, echo_stdout, false));
    let stderr_task = tokio::spawn(drain(stderr_pipe, echo_stderr, true));

    let status = child.wait().await?;

    // Both readers must complete before the run counts as finished.
    let stdout_bytes = join_reader(stdout_task).await?;
    let stderr_bytes = join_reader(stderr_task).await?;
    let elapsed = started.elapsed();

    let exit = match status.code() {
        Some(0) => ExitKind::Success,
        Some(code) => ExitKind::Code(code),
        None => {
            use std::os::unix::process::ExitStatusExt;
            ExitKind::Signal(status.signal().unwrap_or(0))
        }
    };

    tracing::debug!(
        program = %program,
        ?exit,
        elapsed_ms = elapsed.as_millis() as u64,
        "process finished"
    );

    Ok(RunResult {
        exit,
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        elapsed,
    })
}

async fn join_reader(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, CoreError> {
    match task.await {
        Ok(result) => Ok(result?),
        Err(join_err) => Err(CoreError::Io(std::io::Error::other(join_err))),
    }
}

/// Accumulate one pipe to completion, optionally echoing chunks as they
/// arrive. Echoing is a side effect layered on top of accumulation so tests
/// can assert on the returned bytes without capturing the console.
async fn drain<R>(mut reader: R, echo: bool, to_stderr: bool) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        if echo {
            if to_stderr {
                let mut out = tokio::io::stderr();
                out.write_all(&buf[..n]).await?;
                out.flush().await?;
            } else {
                let mut out = tokio::io::stdout();
                out.write_all(&buf[..n]).await?;
                out.flush().await?;
            }
        }
        collected.extend_from_slice(&buf[..n]);
    }
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_stdout_and_classifies_success() {
        let result = execute(&argv(&["sh", "-c", "echo hello"]), None, Capture::Buffered)
            .await
            .unwrap();
        assert_eq!(result.exit, ExitKind::Success);
        assert_eq!(result.stdout, "hello\n");
        assert!(result.stderr.is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_result_not_an_error() {
        let result = execute(&argv(&["sh", "-c", "exit 3"]), None, Capture::Buffered)
            .await
            .unwrap();
        assert_eq!(result.exit, ExitKind::Code(3));
        assert!(!result.exit.is_success());
    }

    #[tokio::test]
    async fn fatal_signal_reports_signal_number() {
        let result = execute(
            &argv(&["sh", "-c", "kill -s SEGV $$"]),
            None,
            Capture::Buffered,
        )
        .await
        .unwrap();
        assert_eq!(result.exit, ExitKind::Signal(11));
        assert_eq!(format!("{}", result.exit), "terminated by signal 11 (SIGSEGV)");
    }

    #[tokio::test]
    async fn stdin_comes_from_the_given_file() {
        let mut input = tempfile::NamedTempFile::new().unwrap();
        write!(input, "41 1\n").unwrap();

        let result = execute(&argv(&["cat"]), Some(input.path()), Capture::Buffered)
            .await
            .unwrap();
        assert_eq!(result.exit, ExitKind::Success);
        assert_eq!(result.stdout, "41 1\n");
    }

    #[tokio::test]
    async fn stderr_is_captured_separately() {
        let result = execute(
            &argv(&["sh", "-c", "echo out; echo err >&2"]),
            None,
            Capture::Buffered,
        )
        .await
        .unwrap();
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
    }

    #[tokio::test]
    async fn streamed_capture_still_accumulates() {
        let result = execute(
            &argv(&["sh", "-c", "echo streamed"]),
            None,
            Capture::Streamed { echo_stderr: false },
        )
        .await
        .unwrap();
        assert_eq!(result.stdout, "streamed\n");
    }

    #[tokio::test]
    async fn missing_executable_is_a_launch_error() {
        let err = execute(
            &argv(&["definitely-not-a-real-binary-xyz"]),
            None,
            Capture::Buffered,
        )
        .await
        .unwrap_err();
        match err {
            CoreError::Launch { command, .. } => {
                assert_eq!(command, "definitely-not-a-real-binary-xyz")
            }
            other => panic!("expected Launch error, got {:?}", other),
        }
    }

    #[test]
    fn signal_names_fall_back_to_unknown() {
        assert_eq!(signal_name(11), "SIGSEGV");
        assert_eq!(signal_name(6), "SIGABRT");
        assert_eq!(signal_name(250), "unknown");
    }
}
