use std::path::PathBuf;
use std::time::Duration;

use maaslin_core::runner::{JobLimits, DEFAULT_QUEUE_TIMEOUT};
use maaslin_core::scratch::RetentionPolicy;
use maaslin_core::scripting::interpreter::DEFAULT_INTERPRETER;

/// Server configuration loaded from environment variables.
///
/// All fields except the analysis script path have sensible defaults
/// suitable for local development. In production, override via environment
/// variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `3600`). Analysis runs are
    /// long, so this is a backstop rather than a latency target.
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Maximum request body size in bytes (default: 1 GiB).
    pub max_upload_bytes: usize,
    /// Analysis script and job runner settings.
    pub runner: RunnerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `3600`                     |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `MAX_UPLOAD_BYTES`     | `1073741824`               |
    ///
    /// See [`RunnerConfig::from_env`] for the runner variables.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| (1usize << 30).to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let runner = RunnerConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            max_upload_bytes,
            runner,
        }
    }
}

/// Where the analysis script lives and how jobs are run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Absolute path of the MaAsLin3 wrapper script.
    pub script_path: PathBuf,
    /// Interpreter used to launch the script; `None` executes it directly.
    pub interpreter: Option<String>,
    /// Directory under which job directories are created.
    pub scratch_root: PathBuf,
    pub retention: RetentionPolicy,
    /// Interval between retention sweeps in seconds.
    pub sweep_interval_secs: u64,
    pub max_concurrent_jobs: usize,
    pub queue_timeout_secs: u64,
    /// Per-job wall-clock limit; unset means no limit.
    pub job_timeout_secs: Option<u64>,
}

/// Default interval between retention sweeps.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

impl RunnerConfig {
    /// Load runner configuration from environment variables.
    ///
    /// | Env Var                       | Required | Default                  |
    /// |-------------------------------|----------|--------------------------|
    /// | `MAASLIN_SCRIPT_PATH`         | **yes**  | --                       |
    /// | `MAASLIN_INTERPRETER`         | no       | `Rscript` (empty = none) |
    /// | `SCRATCH_ROOT`                | no       | OS temp dir              |
    /// | `SCRATCH_RETENTION`           | no       | `86400`                  |
    /// | `SCRATCH_SWEEP_INTERVAL_SECS` | no       | `300`                    |
    /// | `MAX_CONCURRENT_JOBS`         | no       | available parallelism    |
    /// | `QUEUE_TIMEOUT_SECS`          | no       | `300`                    |
    /// | `JOB_TIMEOUT_SECS`            | no       | unset                    |
    ///
    /// # Panics
    ///
    /// Panics if `MAASLIN_SCRIPT_PATH` is missing, if any numeric value does
    /// not parse, or if [`assert_valid`](Self::assert_valid) rejects the result.
    pub fn from_env() -> Self {
        let script_path = PathBuf::from(
            std::env::var("MAASLIN_SCRIPT_PATH")
                .expect("MAASLIN_SCRIPT_PATH must be set in the environment"),
        );

        let interpreter = match std::env::var("MAASLIN_INTERPRETER") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value.trim().to_string()),
            Err(_) => Some(DEFAULT_INTERPRETER.to_string()),
        };

        let scratch_root = std::env::var("SCRATCH_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        let retention: RetentionPolicy = std::env::var("SCRATCH_RETENTION")
            .ok()
            .map(|v| v.parse().expect("SCRATCH_RETENTION is invalid"))
            .unwrap_or_default();

        let sweep_interval_secs: u64 = std::env::var("SCRATCH_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECS.to_string())
            .parse()
            .expect("SCRATCH_SWEEP_INTERVAL_SECS must be a valid u64");

        let max_concurrent_jobs: usize = std::env::var("MAX_CONCURRENT_JOBS")
            .ok()
            .map(|v| v.parse().expect("MAX_CONCURRENT_JOBS must be a valid usize"))
            .unwrap_or_else(|| JobLimits::default().max_concurrent);

        let queue_timeout_secs: u64 = std::env::var("QUEUE_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_QUEUE_TIMEOUT.as_secs().to_string())
            .parse()
            .expect("QUEUE_TIMEOUT_SECS must be a valid u64");

        let job_timeout_secs: Option<u64> = std::env::var("JOB_TIMEOUT_SECS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.parse().expect("JOB_TIMEOUT_SECS must be a valid u64"));

        let config = Self {
            script_path,
            interpreter,
            scratch_root,
            retention,
            sweep_interval_secs,
            max_concurrent_jobs,
            queue_timeout_secs,
            job_timeout_secs,
        };
        config.assert_valid();
        config
    }

    /// Check values that parse but cannot be used.
    ///
    /// # Panics
    ///
    /// Panics on a relative script path or scratch root, a zero job limit,
    /// or a zero sweep interval.
    pub fn assert_valid(&self) {
        assert!(
            self.script_path.is_absolute(),
            "MAASLIN_SCRIPT_PATH must be an absolute path"
        );
        assert!(
            self.scratch_root.is_absolute(),
            "SCRATCH_ROOT must be an absolute path"
        );
        assert!(
            self.max_concurrent_jobs > 0,
            "MAX_CONCURRENT_JOBS must be at least 1"
        );
        assert!(
            self.sweep_interval_secs > 0,
            "SCRATCH_SWEEP_INTERVAL_SECS must be at least 1"
        );
    }

    /// Admission and timeout limits derived from this configuration.
    pub fn limits(&self) -> JobLimits {
        JobLimits {
            max_concurrent: self.max_concurrent_jobs,
            queue_timeout: Duration::from_secs(self.queue_timeout_secs),
            job_timeout: self.job_timeout_secs.map(Duration::from_secs),
        }
    }
}
