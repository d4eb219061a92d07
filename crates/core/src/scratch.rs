//! Per-job scratch space with a retention policy.
//!
//! Every job gets its own directory `<root>/<job_id>` holding the two staged
//! inputs and an `output/` tree written by the analysis script. The
//! [`ScratchManager`] remembers which directories it created so eviction
//! never touches anything else living under a shared temp root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use walkdir::WalkDir;

use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

/// Staged feature table.
pub const FEATURES_FILE: &str = "features.tsv";
/// Staged metadata table.
pub const METADATA_FILE: &str = "metadata.tsv";
/// Directory the analysis script writes its results into.
pub const OUTPUT_DIR: &str = "output";

/// Default time-to-live for job directories: 24 hours.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 3600);

// ---------------------------------------------------------------------------
// Retention policy
// ---------------------------------------------------------------------------

/// What happens to a job directory once its response has been assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Never delete job directories.
    Keep,
    /// Delete the directory as soon as the job result has been collected.
    ReleaseAfterResponse,
    /// Delete directories older than the given age on each sweep.
    ExpireAfter(Duration),
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::ExpireAfter(DEFAULT_RETENTION)
    }
}

impl FromStr for RetentionPolicy {
    type Err = CoreError;

    /// Parses `keep`, `release`, or a TTL in whole seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "release" => Ok(Self::ReleaseAfterResponse),
            secs => secs
                .parse::<u64>()
                .map(|n| Self::ExpireAfter(Duration::from_secs(n)))
                .map_err(|_| {
                    CoreError::Validation(format!(
                        "retention must be 'keep', 'release' or a number of seconds (got '{s}')"
                    ))
                }),
        }
    }
}

// ---------------------------------------------------------------------------
// Job workspace
// ---------------------------------------------------------------------------

/// The on-disk layout of a single job.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    id: JobId,
    dir: PathBuf,
}

impl JobWorkspace {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn features_path(&self) -> PathBuf {
        self.dir.join(FEATURES_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.join(OUTPUT_DIR)
    }

    /// Write both uploads verbatim and create the output directory.
    ///
    /// Nothing is rolled back if a write fails part way.
    pub async fn stage(&self, features: &[u8], metadata: &[u8]) -> Result<(), CoreError> {
        tokio::fs::write(self.features_path(), features).await?;
        tokio::fs::write(self.metadata_path(), metadata).await?;
        tokio::fs::create_dir_all(self.output_dir()).await?;
        Ok(())
    }

    /// List every regular file under `output/`, relative to the job directory.
    ///
    /// Order is whatever the directory walk yields. A missing output
    /// directory yields an empty list.
    pub async fn collect_outputs(&self) -> Result<Vec<String>, CoreError> {
        let job_dir = self.dir.clone();
        let output_dir = self.output_dir();

        tokio::task::spawn_blocking(move || walk_files(&job_dir, &output_dir))
            .await
            .map_err(|e| CoreError::Internal(format!("Output walk task failed: {e}")))
    }
}

fn walk_files(job_dir: &Path, output_dir: &Path) -> Vec<String> {
    if !output_dir.exists() {
        return Vec::new();
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(output_dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable output entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(job_dir).unwrap_or(entry.path());
        files.push(relative.to_string_lossy().into_owned());
    }
    files
}

// ---------------------------------------------------------------------------
// Scratch manager
// ---------------------------------------------------------------------------

/// Lifecycle of a tracked job directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    /// The script may still be writing into the directory.
    Running,
    /// The result was collected at this time; the TTL counts from here.
    Finished(Timestamp),
}

/// Allocates job directories and enforces the retention policy.
///
/// Every directory created here is tracked until it is removed by
/// [`release`](Self::release), [`finish`](Self::finish) under
/// [`RetentionPolicy::ReleaseAfterResponse`], or an eviction sweep. Under
/// [`RetentionPolicy::Keep`] nothing is removed automatically, so the
/// registry holds one small entry per job until it is released explicitly.
#[derive(Debug)]
pub struct ScratchManager {
    root: PathBuf,
    policy: RetentionPolicy,
    jobs: Mutex<HashMap<JobId, JobState>>,
}

impl ScratchManager {
    pub fn new(root: impl Into<PathBuf>, policy: RetentionPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Allocate a fresh job directory under the scratch root.
    pub async fn create(&self) -> Result<JobWorkspace, CoreError> {
        let id = JobId::new_v4();
        let dir = self.root.join(id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        self.jobs.lock().await.insert(id, JobState::Running);
        tracing::debug!(job_id = %id, dir = %dir.display(), "Job workspace created");

        Ok(JobWorkspace { id, dir })
    }

    /// Delete a finished job directory.
    ///
    /// Fails with [`CoreError::Conflict`] while the job is still running.
    pub async fn release(&self, id: JobId) -> Result<(), CoreError> {
        {
            let mut jobs = self.jobs.lock().await;
            match jobs.get(&id).copied() {
                None => {
                    return Err(CoreError::NotFound {
                        entity: "Job",
                        id: id.to_string(),
                    })
                }
                Some(JobState::Running) => {
                    return Err(CoreError::Conflict(format!("Job {id} is still running")))
                }
                Some(JobState::Finished(_)) => {
                    jobs.remove(&id);
                }
            }
        }
        self.remove_dir(id).await?;
        tracing::info!(job_id = %id, "Job workspace released");
        Ok(())
    }

    /// Mark a job as finished and apply the post-response part of the policy.
    ///
    /// From here on the directory may be released or evicted.
    pub async fn finish(&self, workspace: &JobWorkspace) -> Result<(), CoreError> {
        if let Some(state) = self.jobs.lock().await.get_mut(&workspace.id) {
            *state = JobState::Finished(Utc::now());
        }
        if self.policy == RetentionPolicy::ReleaseAfterResponse {
            self.release(workspace.id).await?;
        }
        Ok(())
    }

    /// Delete every tracked directory whose job finished before `now - ttl`.
    ///
    /// Running jobs are never evicted. Returns the number of directories
    /// removed. Policies other than [`RetentionPolicy::ExpireAfter`] never
    /// expire anything.
    pub async fn evict_expired(&self, now: Timestamp) -> usize {
        let RetentionPolicy::ExpireAfter(ttl) = self.policy else {
            return 0;
        };
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let cutoff = now - ttl;

        let expired: Vec<JobId> = {
            let mut jobs = self.jobs.lock().await;
            let ids: Vec<JobId> = jobs
                .iter()
                .filter(|(_, state)| {
                    matches!(state, JobState::Finished(finished) if *finished <= cutoff)
                })
                .map(|(id, _)| *id)
                .collect();
            for id in &ids {
                jobs.remove(id);
            }
            ids
        };

        let mut removed = 0;
        for id in expired {
            match self.remove_dir(id).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::error!(job_id = %id, error = %e, "Failed to evict job workspace"),
            }
        }
        removed
    }

    /// Number of job directories currently tracked.
    pub async fn tracked_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    async fn remove_dir(&self, id: JobId) -> Result<(), CoreError> {
        match tokio::fs::remove_dir_all(self.root.join(id.to_string())).await {
            Ok(()) => Ok(()),
            // Already gone (removed externally); nothing left to do.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
