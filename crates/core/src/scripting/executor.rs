//! Unified script execution interface and shared types.
//!
//! Defines [`ScriptExecutor`], the trait that the interpreter and binary
//! executors implement, along with [`ScriptInput`], [`ScriptOutput`], and
//! [`ScriptError`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Input passed to a script executor.
#[derive(Debug, Clone, Default)]
pub struct ScriptInput {
    /// Positional arguments appended after the script path.
    pub args: Vec<String>,
    /// Additional environment variables set for the child process.
    pub env_vars: Vec<(String, String)>,
    /// Working directory for the child process (uses current dir if `None`).
    pub working_directory: Option<PathBuf>,
    /// Maximum wall-clock time before the process is killed. `None` waits
    /// for as long as the process runs.
    pub timeout: Option<Duration>,
}

/// Captured output from a script execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptOutput {
    /// Complete stdout captured from the process.
    pub stdout: String,
    /// Complete stderr captured from the process.
    pub stderr: String,
    /// Process exit code (`-signal` if killed by a signal on Unix).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Errors that can occur while launching or waiting on a script.
///
/// A non-zero exit code is not an error: it is reported through
/// [`ScriptOutput::exit_code`].
#[derive(Debug)]
pub enum ScriptError {
    /// The script or interpreter was not found at the specified path.
    NotFound(String),
    /// The script file exists but lacks execute permissions.
    PermissionDenied(String),
    /// The script exceeded its configured timeout and was killed.
    Timeout {
        /// Elapsed wall-clock time before the process was killed.
        elapsed_ms: u64,
    },
    /// An I/O error occurred while spawning or communicating with the process.
    IoError(std::io::Error),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Script not found: {path}"),
            Self::PermissionDenied(path) => write!(f, "Permission denied: {path}"),
            Self::Timeout { elapsed_ms } => {
                write!(f, "Script timed out after {elapsed_ms}ms")
            }
            Self::IoError(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            _ => None,
        }
    }
}

/// Trait implemented by the script runtime executors (interpreter, binary).
///
/// Each executor receives a script path and structured input, spawns the
/// appropriate subprocess, and returns the captured output or an error.
pub trait ScriptExecutor: Send + Sync {
    /// Execute the script at `script_path` with the given `input`.
    fn execute(
        &self,
        script_path: &str,
        input: ScriptInput,
    ) -> impl std::future::Future<Output = Result<ScriptOutput, ScriptError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
