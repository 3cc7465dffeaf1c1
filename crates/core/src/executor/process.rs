//! Bounded subprocess execution.

use crate::config::ExecutorSettings;
use crate::error::Result;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use surface_api::ExecOutput;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const READ_CHUNK: usize = 8 * 1024;
/// How long stderr may keep draining after the child is gone.
const STDERR_GRACE: Duration = Duration::from_secs(2);

/// A program plus its explicit argument vector. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }
}

enum Stop {
    Finished,
    TimedOut,
    Cancelled,
}

/// Run `invocation` to completion, timeout or cancellation.
///
/// Stdout is read up to `max_output_bytes`; past that the read stops, the
/// child is killed and `output_truncated` is set. Stderr is drained
/// concurrently and silently capped at `max_stderr_bytes`.
pub async fn run(
    invocation: &Invocation,
    settings: &ExecutorSettings,
    cancel: &CancellationToken,
) -> Result<ExecOutput> {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &invocation.cwd {
        cmd.current_dir(cwd);
    }

    tracing::debug!(program = %invocation.program, args = ?invocation.args, "spawning tool");
    let mut child = cmd.spawn()?;

    let stderr_task = child
        .stderr
        .take()
        .map(|stderr| tokio::spawn(drain_capped(stderr, settings.max_stderr_bytes)));
    let stdout = child.stdout.take();

    let deadline = Instant::now() + settings.timeout;
    let read = async {
        match stdout {
            Some(out) => read_capped(out, settings.max_output_bytes).await,
            None => Ok((Vec::new(), false)),
        }
    };

    let (stdout_bytes, truncated, mut stop) = tokio::select! {
        res = read => {
            let (buf, truncated) = res?;
            (buf, truncated, Stop::Finished)
        }
        _ = tokio::time::sleep_until(deadline) => (Vec::new(), false, Stop::TimedOut),
        _ = cancel.cancelled() => (Vec::new(), false, Stop::Cancelled),
    };

    let mut status = None;
    if matches!(stop, Stop::Finished) && !truncated {
        tokio::select! {
            res = child.wait() => status = Some(res?),
            _ = tokio::time::sleep_until(deadline) => stop = Stop::TimedOut,
            _ = cancel.cancelled() => stop = Stop::Cancelled,
        }
    }

    if status.is_none() {
        if let Err(e) = child.start_kill() {
            tracing::debug!(error = %e, "child already exited");
        }
        let _ = child.wait().await;
    }

    let stderr_bytes = match stderr_task {
        Some(task) => match tokio::time::timeout(STDERR_GRACE, task).await {
            Ok(Ok(Ok(buf))) => buf,
            _ => Vec::new(),
        },
        None => Vec::new(),
    };

    let (timed_out, cancelled) = match stop {
        Stop::Finished => (false, false),
        Stop::TimedOut => (true, false),
        Stop::Cancelled => (false, true),
    };
    if timed_out {
        tracing::warn!(program = %invocation.program, timeout = ?settings.timeout, "tool timed out");
    }
    if truncated {
        tracing::warn!(
            program = %invocation.program,
            limit = settings.max_output_bytes,
            "tool output exceeded capture limit"
        );
    }

    Ok(ExecOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        exit_success: status.is_some_and(|s| s.success()),
        exit_code: status.and_then(|s| s.code()),
        timed_out,
        cancelled,
        output_truncated: truncated,
        warnings: Vec::new(),
    })
}

/// Read until EOF or `limit` bytes; the flag reports whether more was pending.
async fn read_capped<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok((buf, false));
        }
        let room = limit - buf.len();
        if n > room {
            buf.extend_from_slice(&chunk[..room]);
            return Ok((buf, true));
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Keep reading to EOF so the child never blocks on a full pipe, but only
/// retain the first `limit` bytes.
async fn drain_capped<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        let room = limit.saturating_sub(buf.len());
        buf.extend_from_slice(&chunk[..n.min(room)]);
    }
}
