//! Job runner: stage, invoke, collect.
//!
//! A job is one request's unit of work: two uploaded tables, one output
//! directory and exactly one external script invocation. The runner bounds
//! how many invocations run at once and executes each job on its own tokio
//! task so the caller only awaits a handle.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::CoreError;
use crate::params::AnalysisParams;
use crate::scratch::{JobWorkspace, ScratchManager};
use crate::scripting::executor::ScriptInput;
use crate::scripting::ScriptLauncher;
use crate::types::JobId;

/// Default wait for a free job slot before rejecting with [`CoreError::Busy`].
pub const DEFAULT_QUEUE_TIMEOUT: Duration = Duration::from_secs(300);

/// Result of a single job, returned to the caller as-is.
///
/// A non-zero `return_code` is not an error; callers inspect it themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
    /// Files under `output/`, relative to the job directory.
    pub output_files: Vec<String>,
}

/// Admission and timeout limits for the runner.
#[derive(Debug, Clone, Copy)]
pub struct JobLimits {
    /// Maximum number of external processes running at once.
    pub max_concurrent: usize,
    /// How long a request may wait for a free slot.
    pub queue_timeout: Duration,
    /// Per-job wall-clock limit. `None` lets the script run indefinitely.
    pub job_timeout: Option<Duration>,
}

impl Default for JobLimits {
    fn default() -> Self {
        Self {
            max_concurrent: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            queue_timeout: DEFAULT_QUEUE_TIMEOUT,
            job_timeout: None,
        }
    }
}

/// Runs analysis jobs against the configured script.
#[derive(Debug)]
pub struct JobRunner {
    launcher: ScriptLauncher,
    scratch: Arc<ScratchManager>,
    permits: Arc<Semaphore>,
    limits: JobLimits,
}

impl JobRunner {
    pub fn new(launcher: ScriptLauncher, scratch: Arc<ScratchManager>, limits: JobLimits) -> Self {
        let slots = limits.max_concurrent.max(1);
        Self {
            launcher,
            scratch,
            permits: Arc::new(Semaphore::new(slots)),
            limits: JobLimits {
                max_concurrent: slots,
                ..limits
            },
        }
    }

    pub fn scratch(&self) -> &Arc<ScratchManager> {
        &self.scratch
    }

    pub fn limits(&self) -> JobLimits {
        self.limits
    }

    /// Number of job slots currently free.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Build the positional arguments passed after the script path:
    /// the three paths followed by the ten analysis parameters.
    pub fn build_args(workspace: &JobWorkspace, params: &AnalysisParams) -> Vec<String> {
        let mut args = Vec::with_capacity(13);
        args.push(workspace.features_path().to_string_lossy().into_owned());
        args.push(workspace.metadata_path().to_string_lossy().into_owned());
        args.push(workspace.output_dir().to_string_lossy().into_owned());
        args.extend(params.to_args());
        args
    }

    /// Run one job to completion.
    ///
    /// Parameters are validated before anything is written. The job then
    /// waits for a free slot, and runs on a spawned task holding that slot
    /// for its whole lifetime. Dropping the returned future does not stop
    /// a job that has already started.
    pub async fn run(
        self: Arc<Self>,
        features: Vec<u8>,
        metadata: Vec<u8>,
        params: AnalysisParams,
    ) -> Result<JobResult, CoreError> {
        params.check()?;

        let permit = self.acquire_slot().await?;
        let runner = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            let _permit = permit;
            runner.execute(features, metadata, params).await
        });

        handle
            .await
            .map_err(|e| CoreError::Internal(format!("Job task failed: {e}")))?
    }

    async fn acquire_slot(&self) -> Result<OwnedSemaphorePermit, CoreError> {
        let acquire = Arc::clone(&self.permits).acquire_owned();
        match tokio::time::timeout(self.limits.queue_timeout, acquire).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_closed)) => Err(CoreError::Internal("Job slots closed".to_string())),
            Err(_elapsed) => {
                tracing::warn!(
                    max_concurrent = self.limits.max_concurrent,
                    "No job slot became free, rejecting request"
                );
                Err(CoreError::Busy(format!(
                    "all {} job slots are in use",
                    self.limits.max_concurrent
                )))
            }
        }
    }

    async fn execute(
        &self,
        features: Vec<u8>,
        metadata: Vec<u8>,
        params: AnalysisParams,
    ) -> Result<JobResult, CoreError> {
        let workspace = self.scratch.create().await?;
        let result = self
            .execute_in(&workspace, &features, &metadata, &params)
            .await;
        // The directory only becomes eligible for release or eviction here.
        self.finish(&workspace).await;
        result
    }

    async fn execute_in(
        &self,
        workspace: &JobWorkspace,
        features: &[u8],
        metadata: &[u8],
        params: &AnalysisParams,
    ) -> Result<JobResult, CoreError> {
        let job_id = workspace.id();
        workspace.stage(features, metadata).await?;
        tracing::info!(
            %job_id,
            features_bytes = features.len(),
            metadata_bytes = metadata.len(),
            "Job staged"
        );

        let input = ScriptInput {
            args: Self::build_args(workspace, params),
            env_vars: vec![("MAASLIN_JOB_ID".to_string(), job_id.to_string())],
            working_directory: Some(workspace.dir().to_path_buf()),
            timeout: self.limits.job_timeout,
        };

        let output = self.launcher.launch(input).await.map_err(|e| {
            tracing::error!(%job_id, error = %e, "Analysis script could not be run");
            CoreError::from(e)
        })?;

        let output_files = workspace.collect_outputs().await?;

        if output.exit_code == 0 {
            tracing::info!(
                %job_id,
                duration_ms = output.duration_ms,
                output_files = output_files.len(),
                "Job finished"
            );
        } else {
            tracing::warn!(
                %job_id,
                exit_code = output.exit_code,
                duration_ms = output.duration_ms,
                output_files = output_files.len(),
                "Analysis script exited with non-zero status"
            );
        }

        Ok(JobResult {
            job_id,
            stdout: output.stdout,
            stderr: output.stderr,
            return_code: output.exit_code,
            output_files,
        })
    }

    async fn finish(&self, workspace: &JobWorkspace) {
        if let Err(e) = self.scratch.finish(workspace).await {
            tracing::error!(job_id = %workspace.id(), error = %e, "Failed to release job workspace");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
