//! Interpreter-based script executor.
//!
//! Spawns an interpreter (`Rscript` in production, `bash` in tests) with the
//! script path as its first argument, followed by the positional arguments
//! from [`ScriptInput`].

use super::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use super::subprocess;

/// Interpreter used for the MaAsLin3 wrapper script.
pub const DEFAULT_INTERPRETER: &str = "Rscript";

/// Executor that runs scripts through an interpreter found on `PATH` or at
/// an absolute location.
#[derive(Debug, Clone)]
pub struct InterpreterExecutor {
    program: String,
}

impl InterpreterExecutor {
    /// Create an executor that launches scripts with `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The interpreter program this executor launches.
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for InterpreterExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPRETER)
    }
}

impl ScriptExecutor for InterpreterExecutor {
    async fn execute(
        &self,
        script_path: &str,
        input: ScriptInput,
    ) -> Result<ScriptOutput, ScriptError> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.arg(script_path);
        subprocess::run_command(&mut cmd, input).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::scripting::test_helpers::write_temp_script;

    fn bash() -> InterpreterExecutor {
        InterpreterExecutor::new("bash")
    }

    #[test]
    fn default_interpreter_is_rscript() {
        assert_eq!(InterpreterExecutor::default().program(), "Rscript");
    }

    #[tokio::test]
    async fn test_interpreter_env_vars() {
        let script = write_temp_script("echo $MY_VAR\n");
        let input = ScriptInput {
            env_vars: vec![("MY_VAR".to_string(), "hello_world".to_string())],
            ..ScriptInput::default()
        };
        let output = bash()
            .execute(script.to_str().expect("path"), input)
            .await
            .expect("execute");
        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("hello_world"));
    }

    #[tokio::test]
    async fn test_interpreter_nonzero_exit_is_output() {
        let script = write_temp_script("echo boom >&2\nexit 42\n");
        let output = bash()
            .execute(script.to_str().expect("path"), ScriptInput::default())
            .await
            .expect("execute");
        assert_eq!(output.exit_code, 42);
        assert_eq!(output.stderr.trim(), "boom");
    }

    #[tokio::test]
    async fn test_interpreter_timeout() {
        let script = write_temp_script("sleep 60\n");
        let input = ScriptInput {
            timeout: Some(Duration::from_millis(200)),
            ..ScriptInput::default()
        };
        let result = bash()
            .execute(script.to_str().expect("path"), input)
            .await;
        assert_matches!(result, Err(ScriptError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let script = write_temp_script("true\n");
        let result = InterpreterExecutor::new("/nonexistent/Rscript")
            .execute(script.to_str().expect("path"), ScriptInput::default())
            .await;
        assert_matches!(result, Err(ScriptError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_interpreter_working_directory() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = write_temp_script("pwd\n");
        let input = ScriptInput {
            working_directory: Some(dir.path().to_path_buf()),
            ..ScriptInput::default()
        };
        let output = bash()
            .execute(script.to_str().expect("path"), input)
            .await
            .expect("execute");
        assert_eq!(output.exit_code, 0);
        // The resolved path may differ due to symlinks, so canonicalize both.
        let expected = dir.path().canonicalize().expect("canonicalize dir");
        let actual = std::path::Path::new(output.stdout.trim())
            .canonicalize()
            .expect("canonicalize pwd");
        assert_eq!(actual, expected);
    }
}
