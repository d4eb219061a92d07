//! Runtime selection for the analysis script.
//!
//! The script location is always an explicit absolute path supplied by
//! configuration. It is never derived from the current working directory.

use std::path::{Path, PathBuf};

use super::binary::BinaryExecutor;
use super::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use super::interpreter::InterpreterExecutor;
use crate::error::CoreError;

/// How the script is started.
#[derive(Debug, Clone)]
pub enum Runtime {
    /// `<interpreter> <script> <args...>`
    Interpreter(InterpreterExecutor),
    /// `<script> <args...>`
    Binary(BinaryExecutor),
}

/// A configured analysis script plus the runtime used to start it.
#[derive(Debug, Clone)]
pub struct ScriptLauncher {
    script_path: PathBuf,
    runtime: Runtime,
}

impl ScriptLauncher {
    /// Build a launcher for the script at `script_path`.
    ///
    /// `interpreter` selects [`Runtime::Interpreter`]; `None` runs the script
    /// directly. Relative script paths are rejected.
    pub fn new(
        script_path: impl Into<PathBuf>,
        interpreter: Option<String>,
    ) -> Result<Self, CoreError> {
        let script_path = script_path.into();
        if !script_path.is_absolute() {
            return Err(CoreError::Validation(format!(
                "Script path must be absolute, got '{}'",
                script_path.display()
            )));
        }
        if script_path.to_str().is_none() {
            return Err(CoreError::Validation(format!(
                "Script path must be valid UTF-8, got '{}'",
                script_path.display()
            )));
        }

        let runtime = match interpreter {
            Some(program) if !program.trim().is_empty() => {
                Runtime::Interpreter(InterpreterExecutor::new(program.trim()))
            }
            _ => Runtime::Binary(BinaryExecutor),
        };

        Ok(Self {
            script_path,
            runtime,
        })
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Run the script once with `input`, dispatching to the configured runtime.
    pub async fn launch(&self, input: ScriptInput) -> Result<ScriptOutput, ScriptError> {
        // Checked to be UTF-8 in `new`.
        let script = self.script_path.to_string_lossy();
        match &self.runtime {
            Runtime::Interpreter(executor) => executor.execute(&script, input).await,
            Runtime::Binary(executor) => executor.execute(&script, input).await,
        }
    }
}
