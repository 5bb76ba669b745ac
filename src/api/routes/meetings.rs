//! Meeting processing endpoints.
//!
//! Provides HTTP endpoints for:
//! - Processing an uploaded file (POST /transcribe)
//! - Processing the latest saved transcript (POST /transcribe/from-file)
//! - Saving the latest transcript (POST /save-transcript)
//! - Reading the latest transcript (GET /get-transcript)

use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::pipeline::MeetingOutcome;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// Request body for saving a transcript directly.
#[derive(Debug, Deserialize)]
pub struct SaveTranscriptRequest {
    pub transcript: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/transcribe", post(transcribe_upload))
        .route("/transcribe/from-file", post(transcribe_latest))
        .route("/save-transcript", post(save_transcript))
        .route("/get-transcript", get(get_transcript))
        .with_state(state)
}

/// POST /transcribe - Process an uploaded recording (`mp3`, `wav`, `m4a`) or transcript (`txt`).
///
/// Expects a multipart form with a `file` field.
async fn transcribe_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<MeetingOutcome>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("Uploaded file has no name"))?;
        let contents = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

        info!("Received upload {:?} ({} bytes)", file_name, contents.len());

        let cancel = state.shutdown.child_token();
        let outcome = state
            .pipeline
            .process_upload(&file_name, contents.to_vec(), &cancel)
            .await?;
        return Ok(Json(outcome));
    }

    Err(ApiError::bad_request("Missing `file` field"))
}

/// POST /transcribe/from-file - Run the text pipeline on the latest saved transcript.
async fn transcribe_latest(State(state): State<AppState>) -> ApiResult<Json<MeetingOutcome>> {
    state
        .pipeline
        .process_latest()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("File not found."))
}

/// POST /save-transcript - Overwrite the latest transcript slot.
async fn save_transcript(
    State(state): State<AppState>,
    Json(request): Json<SaveTranscriptRequest>,
) -> ApiResult<Json<Value>> {
    let path = state
        .pipeline
        .transcripts()
        .save_latest(&request.transcript)
        .await?;

    Ok(Json(json!({
        "status": "saved",
        "path": path.to_string_lossy(),
    })))
}

/// GET /get-transcript - The latest transcript as plain text.
async fn get_transcript(State(state): State<AppState>) -> ApiResult<Response> {
    match state.pipeline.transcripts().read_latest().await? {
        Some(text) => Ok(text.into_response()),
        None => Ok((StatusCode::NOT_FOUND, "Transcript not found").into_response()),
    }
}
