//! Process execution utilities with timeout support
//!
//! Provides helpers for running the extractor (yt-dlp, and the ffmpeg it
//! drives) with a wall-clock bound, so a hung process cannot hold a worker
//! slot forever.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often a blocking wait checks whether the child has exited
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error while waiting for {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run an async Command with a timeout.
///
/// Returns the process Output on success. The child is killed if the timeout
/// fires first.
pub async fn run_with_timeout(cmd: &mut tokio::process::Command, timeout: Duration) -> Result<Output, ProcessError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    cmd.kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(ProcessError::Spawn { program, source }),
        Err(_) => Err(ProcessError::Timeout { program, timeout }),
    }
}

/// Blocking variant for code that already runs on a blocking worker thread.
///
/// stdout and stderr are drained on helper threads while the child runs, so a
/// chatty process (a multi-megabyte `--dump-single-json`) cannot stall on a
/// full pipe.
///
/// The child leads its own process group. On timeout the whole group is
/// killed, ffmpeg included, and the call only returns once every process
/// holding the pipes is gone, so nothing can write into the work dir after
/// the caller has cleaned it.
pub fn run_blocking_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, ProcessError> {
    let program = cmd.get_program().to_string_lossy().into_owned();

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_until(&mut child, timeout).map_err(|source| ProcessError::Io {
        program: program.clone(),
        source,
    })?;

    let Some(status) = status else {
        log::error!("{} timed out after {}s, killing", program, timeout.as_secs());
        if let Err(e) = kill_tree(&mut child) {
            log::warn!("Failed to kill {} process group: {}", program, e);
        }
        let _ = child.wait(); // Reap the zombie
        // Pipes close once the last process in the group has exited
        let _ = stdout.join();
        let _ = stderr.join();
        return Err(ProcessError::Timeout { program, timeout });
    };

    Ok(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

fn drain<R>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// `Ok(None)` means the deadline passed with the child still running.
fn wait_until(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_run_collects_output() {
        let output = run_blocking_with_timeout(
            Command::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]),
            Duration::from_secs(10),
        )
        .unwrap();

        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
    }

    #[test]
    fn test_blocking_run_handles_large_output() {
        // Well past a pipe buffer; would deadlock without concurrent draining.
        let output = run_blocking_with_timeout(
            Command::new("sh").args(["-c", "head -c 1000000 /dev/zero"]),
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(output.stdout.len(), 1_000_000);
    }

    #[test]
    fn test_blocking_run_times_out() {
        let err = run_blocking_with_timeout(Command::new("sleep").arg("5"), Duration::from_millis(300)).unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }

    #[test]
    fn test_timeout_kills_background_children() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("late");
        let script = format!("(sleep 1; touch '{}') & sleep 30", marker.display());

        let started = Instant::now();
        let err = run_blocking_with_timeout(Command::new("sh").args(["-c", &script]), Duration::from_millis(300))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists(), "background child outlived the timeout");
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let err = run_blocking_with_timeout(&mut Command::new("definitely-not-a-binary-xyz"), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_async_run_times_out() {
        let mut cmd = tokio::process::Command::new("sleep");
        cmd.arg("5");
        let err = run_with_timeout(&mut cmd, Duration::from_millis(200)).await.unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }
}
