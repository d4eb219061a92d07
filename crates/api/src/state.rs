use std::sync::Arc;

use maaslin_core::error::CoreError;
use maaslin_core::runner::JobRunner;
use maaslin_core::scratch::ScratchManager;
use maaslin_core::scripting::ScriptLauncher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Runs analysis jobs; owns the job slots.
    pub runner: Arc<JobRunner>,
    /// Per-job scratch directories (shared with the runner and the
    /// retention task).
    pub scratch: Arc<ScratchManager>,
}

impl AppState {
    /// Wire the scratch manager, script launcher and job runner from config.
    pub fn from_config(config: ServerConfig) -> Result<Self, CoreError> {
        let runner_config = &config.runner;
        let launcher = ScriptLauncher::new(
            runner_config.script_path.clone(),
            runner_config.interpreter.clone(),
        )?;
        let scratch = Arc::new(ScratchManager::new(
            runner_config.scratch_root.clone(),
            runner_config.retention,
        ));
        let runner = Arc::new(JobRunner::new(
            launcher,
            Arc::clone(&scratch),
            runner_config.limits(),
        ));

        Ok(Self {
            config: Arc::new(config),
            runner,
            scratch,
        })
    }
}
