//! Shared subprocess management utilities.
//!
//! Provides [`run_command`], the common spawn + capture + timeout logic used
//! by both executors. Each executor builds a [`tokio::process::Command`]
//! appropriate for its runtime and delegates the rest here.

use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::executor::{ScriptError, ScriptInput, ScriptOutput};

/// Maximum stdout or stderr size retained per stream (10 MiB).
///
/// Output past this limit is read and discarded so the child never stalls
/// on a full pipe.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Spawn `cmd` as a child process, capture stdout/stderr, and enforce the
/// optional timeout.
///
/// The caller sets the program and any leading arguments; the positional
/// arguments, environment variables and working directory from
/// [`ScriptInput`] are applied here.
pub async fn run_command(
    cmd: &mut Command,
    input: ScriptInput,
) -> Result<ScriptOutput, ScriptError> {
    // `kill_on_drop(true)` kills the child when it is dropped (e.g. on timeout).
    cmd.args(&input.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in &input.env_vars {
        cmd.env(key, value);
    }

    if let Some(dir) = &input.working_directory {
        cmd.current_dir(dir);
    }

    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let start = Instant::now();

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScriptError::NotFound(program.clone()),
        std::io::ErrorKind::PermissionDenied => ScriptError::PermissionDenied(program.clone()),
        _ => ScriptError::IoError(e),
    })?;

    // Read stdout/stderr in spawned tasks so `child.wait()` can still
    // borrow `&mut child`.
    let mut stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let mut stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    // A descendant that inherited the pipes keeps the readers open after
    // the child exits, so the deadline covers the readers as well.
    let completion = async {
        let status = child.wait().await;
        let stdout = (&mut stdout_task).await.unwrap_or_default();
        let stderr = (&mut stderr_task).await.unwrap_or_default();
        (status, stdout, stderr)
    };

    let (wait_result, stdout_bytes, stderr_bytes) = match input.timeout {
        Some(limit) => match tokio::time::timeout(limit, completion).await {
            Ok(done) => done,
            Err(_elapsed) => {
                stdout_task.abort();
                stderr_task.abort();
                // `child` is dropped on return, which kills the process.
                return Err(ScriptError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
        },
        None => completion.await,
    };

    let status = wait_result.map_err(ScriptError::IoError)?;
    let duration_ms = start.elapsed().as_millis() as u64;

    Ok(ScriptOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        exit_code: exit_code(status),
        duration_ms,
    })
}

/// Map an exit status to a single integer.
///
/// A process killed by a signal reports the negated signal number on Unix
/// and `-1` elsewhere.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}

/// Read an entire output stream, keeping at most [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut h) = handle else {
        return buf;
    };

    let _ = (&mut h)
        .take(MAX_OUTPUT_BYTES as u64)
        .read_to_end(&mut buf)
        .await;

    // Drain the remainder.
    let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
