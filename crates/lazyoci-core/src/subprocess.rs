//! A first-class spawn-and-capture helper for the external binaries this
//! system delegates to (container-image builders, the Helm CLI, the Docker
//! CLI, credential helpers, version-control tools).
//!
//! Every subprocess invocation goes through [`run`]: stderr is always
//! captured, an optional payload can be piped to stdin, and a wall-clock
//! timeout kills the child rather than leaving it to run unbounded.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};

/// Captured output of a subprocess that exited successfully.
#[derive(Debug, Clone)]
pub struct SubprocessOutput {
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl SubprocessOutput {
    /// `stdout` decoded as UTF-8, lossily.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Run `command` with `args`, optionally in `cwd`, optionally piping
/// `stdin` to the child, and kill it if it has not exited within
/// `timeout`.
///
/// # Errors
/// Returns [`Error::Subprocess`] if the binary cannot be spawned, if it
/// exits non-zero (stderr included in the message), or if it is killed
/// after exceeding `timeout`.
pub async fn run<I, S>(
    command: &str,
    args: I,
    cwd: Option<&Path>,
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<SubprocessOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut cmd = tokio::process::Command::new(command);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::subprocess(command, format!("failed to spawn: {e}")))?;

    if let Some(payload) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(payload)
                .await
                .map_err(|e| Error::subprocess(command, format!("failed to write stdin: {e}")))?;
        }
    }

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        Error::subprocess(command, "child process had no stdout pipe")
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        Error::subprocess(command, "child process had no stderr pipe")
    })?;

    let io_and_wait = async {
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let (stdout_res, stderr_res, status) = tokio::join!(
            stdout_pipe.read_to_end(&mut stdout_buf),
            stderr_pipe.read_to_end(&mut stderr_buf),
            child.wait(),
        );
        (stdout_res, stderr_res, status, stdout_buf, stderr_buf)
    };

    match tokio::time::timeout(timeout, io_and_wait).await {
        Ok((stdout_res, stderr_res, status, stdout_buf, stderr_buf)) => {
            stdout_res.map_err(|e| Error::subprocess(command, format!("failed reading stdout: {e}")))?;
            stderr_res.map_err(|e| Error::subprocess(command, format!("failed reading stderr: {e}")))?;
            let status = status.map_err(|e| Error::subprocess(command, format!("failed waiting: {e}")))?;
            if status.success() {
                Ok(SubprocessOutput { stdout: stdout_buf, stderr: stderr_buf })
            } else {
                Err(Error::subprocess(
                    command,
                    format!("{status}: {}", String::from_utf8_lossy(&stderr_buf)),
                ))
            }
        }
        Err(_) => {
            let _ = child.kill().await;
            Err(Error::subprocess(command, format!("timed out after {timeout:?} and was killed")))
        }
    }
}

/// True when `command` resolves to an executable on `PATH`.
#[must_use]
pub fn binary_exists(command: &str) -> bool {
    let Ok(path_var) = std::env::var("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| {
        let candidate = dir.join(command);
        candidate.is_file()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_and_captures_stdout() {
        let out = run("echo", ["hello"], None, None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.stdout_string().trim(), "hello");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error_with_stderr() {
        let err = run(
            "sh",
            ["-c", "echo boom 1>&2; exit 1"],
            None,
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let err = run("definitely-not-a-real-binary", Vec::<&str>::new(), None, None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Subprocess { .. }));
    }

    #[tokio::test]
    async fn stdin_is_piped_through() {
        let out = run("cat", Vec::<&str>::new(), None, Some(b"piped in"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.stdout_string(), "piped in");
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let err = run(
            "sleep",
            ["5"],
            None,
            None,
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
