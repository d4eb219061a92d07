//! Handlers for running MaAsLin jobs and releasing their scratch space.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use maaslin_core::params::AnalysisParams;
use maaslin_core::runner::JobResult;
use maaslin_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the feature table.
pub const FEATURES_FIELD: &str = "features";
/// Multipart field carrying the metadata table.
pub const METADATA_FIELD: &str = "metadata";

/// Everything extracted from a `/run-maaslin` form.
#[derive(Debug)]
struct JobUpload {
    features: Vec<u8>,
    metadata: Vec<u8>,
    params: AnalysisParams,
}

/// Read the multipart body.
///
/// The two tables are taken verbatim; their content is never inspected.
/// Text fields named after an analysis parameter override its default and
/// any other field is ignored.
async fn read_upload(mut multipart: Multipart) -> AppResult<JobUpload> {
    let mut features: Option<Vec<u8>> = None;
    let mut metadata: Option<Vec<u8>> = None;
    let mut params = AnalysisParams::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FEATURES_FIELD => features = Some(field.bytes().await?.into()),
            METADATA_FIELD => metadata = Some(field.bytes().await?.into()),
            _ => {
                let value = field.text().await?;
                if !params.set(&name, &value)? {
                    tracing::debug!(field = %name, "Ignoring unknown form field");
                }
            }
        }
    }

    let features = features.ok_or_else(|| missing_field(FEATURES_FIELD))?;
    let metadata = metadata.ok_or_else(|| missing_field(METADATA_FIELD))?;

    Ok(JobUpload {
        features,
        metadata,
        params,
    })
}

fn missing_field(name: &str) -> AppError {
    AppError::BadRequest(format!("Missing required file field '{name}'"))
}

/// POST /run-maaslin
///
/// Stage the uploaded tables, run the analysis script once, and return its
/// output. A non-zero `return_code` still yields 200; callers decide what
/// it means.
pub async fn run_maaslin(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<JobResult>> {
    let upload = read_upload(multipart).await?;

    let result = state
        .runner
        .clone()
        .run(upload.features, upload.metadata, upload.params)
        .await?;

    Ok(Json(result))
}

/// DELETE /jobs/{job_id}
///
/// Remove a job's working directory. Returns 204 on success.
pub async fn release_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<StatusCode> {
    let id = JobId::parse_str(&job_id)
        .map_err(|_| AppError::BadRequest(format!("Invalid job id '{job_id}'")))?;

    state.scratch.release(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
