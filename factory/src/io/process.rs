//! Child process execution for the subprocess provider.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Bounds applied to a single child process.
#[derive(Debug, Clone, Copy)]
pub struct ProcessLimits {
    pub timeout: Duration,
    /// Maximum bytes kept per stream; the rest is drained and counted.
    pub output_limit_bytes: usize,
}

/// Bytes kept from one stream plus how many were dropped past the limit.
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    dropped: usize,
}

/// What a finished (or killed) child left behind.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Last `max_chars` characters of stderr, for error messages.
    pub fn stderr_tail(&self, max_chars: usize) -> String {
        let text = String::from_utf8_lossy(&self.stderr);
        let text = text.trim();
        let skip = text.chars().count().saturating_sub(max_chars);
        text.chars().skip(skip).collect()
    }
}

/// Spawn `cmd`, write `input` to its stdin, and collect its output within `limits`.
///
/// Both pipes are drained on their own threads before stdin is written, so a
/// chatty child cannot block on a full pipe. A child still running after
/// `limits.timeout` is killed and reported with `timed_out`.
#[instrument(skip_all, fields(timeout_ms = limits.timeout.as_millis() as u64))]
pub fn run_with_input(
    mut cmd: Command,
    input: Option<&[u8]>,
    limits: ProcessLimits,
) -> Result<CommandOutput> {
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    let mut child = cmd.spawn().context("spawn command")?;
    let stdout = drain(child.stdout.take(), limits.output_limit_bytes)?;
    let stderr = drain(child.stderr.take(), limits.output_limit_bytes)?;

    if let Some(input) = input {
        feed_stdin(&mut child, input);
    }

    let (status, timed_out) = wait_or_kill(&mut child, limits.timeout)?;
    let stdout = collect(stdout).context("collect stdout")?;
    let stderr = collect(stderr).context("collect stderr")?;
    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_dropped = stdout.dropped,
            stderr_dropped = stderr.dropped,
            "child output exceeded limit"
        );
    }

    debug!(exit_code = ?status.code(), timed_out, stdout_len = stdout.bytes.len(), "child finished");
    Ok(CommandOutput {
        status,
        stdout: stdout.bytes,
        stderr: stderr.bytes,
        stdout_truncated: stdout.dropped,
        timed_out,
    })
}

fn drain<R>(pipe: Option<R>, limit: usize) -> Result<JoinHandle<io::Result<Captured>>>
where
    R: Read + Send + 'static,
{
    let pipe = pipe.ok_or_else(|| anyhow!("child stream was not piped"))?;
    Ok(thread::spawn(move || read_bounded(pipe, limit)))
}

fn feed_stdin(child: &mut Child, input: &[u8]) {
    let Some(mut stdin) = child.stdin.take() else {
        return;
    };
    // Dropping `stdin` afterwards closes the pipe so the child sees EOF.
    if let Err(err) = stdin.write_all(input) {
        // The child may exit without reading; its status carries the real failure.
        warn!(%err, "child closed stdin early");
    }
}

fn wait_or_kill(child: &mut Child, timeout: Duration) -> Result<(ExitStatus, bool)> {
    if let Some(status) = child.wait_timeout(timeout).context("wait for child")? {
        return Ok((status, false));
    }
    warn!(timeout_ms = timeout.as_millis() as u64, "child timed out, killing");
    child.kill().context("kill child")?;
    let status = child.wait().context("reap killed child")?;
    Ok((status, true))
}

fn collect(handle: JoinHandle<io::Result<Captured>>) -> Result<Captured> {
    handle
        .join()
        .map_err(|_| anyhow!("output reader panicked"))?
        .context("read child output")
}

fn read_bounded(mut reader: impl Read, limit: usize) -> io::Result<Captured> {
    let mut captured = Captured::default();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            return Ok(captured);
        }
        let keep = n.min(limit.saturating_sub(captured.bytes.len()));
        captured.bytes.extend_from_slice(&chunk[..keep]);
        captured.dropped += n - keep;
    }
}
