//! Job submission and status endpoints
//!
//! POST /api/slushify       multipart upload → transform job (`/api/vaporize` alias)
//! GET  /api/status/:job_id job snapshot
//! POST /api/adjust/:job_id single-effect adjustment of a previous output

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, VaporError};
use crate::jobs::{Job, JobKind, JobState, TransformRequest};
use crate::options::ProcessingOptions;
use crate::pipeline::TempFiles;
use crate::AppState;

/// Preset used when the upload names none
pub const DEFAULT_PRESET: &str = "slushwave";

/// Largest accepted multipart body
pub const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Response for an accepted job
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub task_id: Uuid,
    pub status_url: String,
}

impl SubmitResponse {
    fn accepted(job_id: Uuid) -> (StatusCode, Json<SubmitResponse>) {
        (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                task_id: job_id,
                status_url: format!("/api/status/{}", job_id),
            }),
        )
    }
}

/// Job snapshot as seen by pollers
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub state: JobState,
    /// Human-readable progress or outcome
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<Job> for StatusResponse {
    fn from(job: Job) -> Self {
        let status = match job.state {
            JobState::Pending => "Pending...".to_string(),
            JobState::InProgress => job.progress_note.clone(),
            JobState::Succeeded => "Task completed!".to_string(),
            JobState::Failed => job.error.clone().unwrap_or_else(|| job.progress_note.clone()),
        };
        let result_url = job
            .result_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|name| format!("/api/outputs/{}", name.to_string_lossy()));

        Self {
            job_id: job.id,
            kind: job.kind,
            state: job.state,
            status,
            result: job.result_path.map(|p| p.display().to_string()),
            result_url,
            error: job.error,
            created_at: job.created_at,
            finished_at: job.finished_at,
        }
    }
}

/// Body of POST /api/adjust/:job_id
#[derive(Debug, Default, Deserialize)]
pub struct AdjustRequest {
    pub effect_name: Option<String>,
    pub effect_params: Option<HashMap<String, f64>>,
}

/// POST /api/slushify
///
/// Multipart fields: `file` (required), `preset`, `reference_file`,
/// `options` (JSON ProcessingOptions).
pub async fn vaporize(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    // Saved files are removed again unless a job takes them over
    let mut saved = TempFiles::new();
    let mut upload: Option<(PathBuf, String)> = None;
    let mut reference: Option<PathBuf> = None;
    let mut preset: Option<String> = None;
    let mut options: Option<ProcessingOptions> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "reference_file" => {
                let filename = field.file_name().map(sanitize_filename).unwrap_or_default();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read {}: {}", name, e)))?;

                if filename.is_empty() {
                    if name == "file" {
                        return Err(ApiError::BadRequest("No selected file".into()));
                    }
                    continue;
                }

                let path = state
                    .uploads_dir
                    .join(format!("{}_{}", Uuid::new_v4(), filename));
                saved.track(path.clone());
                tokio::fs::write(&path, &data).await?;
                tracing::debug!(
                    field = %name,
                    path = %path.display(),
                    bytes = data.len(),
                    "Upload saved"
                );

                if name == "file" {
                    upload = Some((path, filename));
                } else {
                    reference = Some(path);
                }
            }
            "preset" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read preset: {}", e)))?;
                if !value.trim().is_empty() {
                    preset = Some(value.trim().to_string());
                }
            }
            "options" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read options: {}", e)))?;
                let parsed = serde_json::from_str(&value)
                    .map_err(|e| ApiError::BadRequest(format!("Invalid options JSON: {}", e)))?;
                options = Some(parsed);
            }
            other => tracing::debug!(field = %other, "Ignoring unknown multipart field"),
        }
    }

    let (input, original_filename) =
        upload.ok_or_else(|| ApiError::BadRequest("No file part".into()))?;

    let mut options = options.unwrap_or_default();
    match preset {
        Some(p) => options.preset = Some(p),
        None if options.preset.is_none() => options.preset = Some(DEFAULT_PRESET.to_string()),
        None => {}
    }

    let job_id = state
        .orchestrator
        .submit_transform(TransformRequest {
            input,
            original_filename,
            options,
            reference,
        })
        .map_err(|e| record_failure(&state, e))?;

    // The job owns the uploads now
    saved.release();

    Ok(SubmitResponse::accepted(job_id))
}

/// GET /api/status/:job_id
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let job = Uuid::parse_str(&job_id)
        .ok()
        .and_then(|id| state.orchestrator.status(&id))
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", job_id)))?;

    tracing::debug!(job_id = %job.id, state = ?job.state, "Status query");
    Ok(Json(job.into()))
}

/// POST /api/adjust/:job_id
pub async fn adjust(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let request: AdjustRequest = if body.is_empty() {
        AdjustRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid adjustment data provided: {}", e)))?
    };

    let new_id = state
        .orchestrator
        .submit_adjust(&job_id, request.effect_name, request.effect_params)
        .map_err(|e| record_failure(&state, e))?;

    Ok(SubmitResponse::accepted(new_id))
}

/// Remember server-side failures for /health
fn record_failure(state: &AppState, error: VaporError) -> ApiError {
    let api_error = ApiError::from(error);
    if matches!(api_error, ApiError::Internal(_) | ApiError::Io(_)) {
        if let Ok(mut last_error) = state.last_error.try_write() {
            *last_error = Some(api_error.to_string());
        }
    }
    api_error
}

/// Reduce a client filename to a safe single path component
///
/// Keeps ASCII letters, digits, `.`, `-` and `_`; whitespace becomes `_`;
/// leading dots and underscores are dropped.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    cleaned.trim_start_matches(|c: char| c == '.' || c == '_').to_string()
}

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/api/slushify", post(vaporize))
        .route("/api/vaporize", post(vaporize))
        .route("/api/status/:job_id", get(job_status))
        .route("/api/adjust/:job_id", post(adjust))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
