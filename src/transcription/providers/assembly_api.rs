use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{PipelineError, Result};
use crate::transcription::{TranscriptionJob, TranscriptionService};

pub const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com/v2";

/// Applies to job creation and polling.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Uploads carry the whole recording, so they get longer.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Response from the upload endpoint
#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

/// Request body for creating a transcript
#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    speaker_labels: bool,
    auto_chapters: bool,
}

/// Response from transcript creation
#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

pub struct AssemblyAIProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AssemblyAIProvider {
    pub fn new(api_key: String, endpoint: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                PipelineError::ServiceUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;
        let base_url = endpoint.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        info!(
            "Initialized AssemblyAI provider with base URL: {}",
            base_url
        );

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    /// Read a response body, turning non-success statuses into `ServiceUnavailable`.
    async fn checked_body(&self, response: reqwest::Response, action: &str) -> Result<String> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            PipelineError::ServiceUnavailable(format!("Failed to read {} response body: {}", action, e))
        })?;

        if !status.is_success() {
            error!(
                "AssemblyAI {} failed with status {}: {}",
                action, status, response_text
            );

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
                return Err(PipelineError::ServiceUnavailable(format!(
                    "AssemblyAI API error: {}",
                    error_response.error
                )));
            }

            return Err(PipelineError::ServiceUnavailable(format!(
                "AssemblyAI {} failed with status {}: {}",
                action, status, response_text
            )));
        }

        Ok(response_text)
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &str, action: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        PipelineError::ServiceUnavailable(format!("Failed to parse {} response: {}", action, e))
    })
}

#[async_trait]
impl TranscriptionService for AssemblyAIProvider {
    fn name(&self) -> &'static str {
        "AssemblyAI API"
    }

    /// Upload audio file to AssemblyAI and get a URL
    async fn upload(&self, audio_path: &Path) -> Result<String> {
        let upload_url = format!("{}/upload", self.base_url);

        debug!("Uploading audio file to AssemblyAI: {:?}", audio_path);

        let audio_data = tokio::fs::read(audio_path).await.map_err(|e| {
            PipelineError::Storage(format!("Failed to read audio file {:?}: {}", audio_path, e))
        })?;

        let response = self
            .client
            .post(&upload_url)
            .header("Authorization", &self.api_key)
            .header("Content-Type", "application/octet-stream")
            .timeout(UPLOAD_TIMEOUT)
            .body(audio_data)
            .send()
            .await
            .map_err(|e| {
                PipelineError::ServiceUnavailable(format!("Failed to upload audio to AssemblyAI: {}", e))
            })?;

        let body = self.checked_body(response, "upload").await?;
        let upload_response: UploadResponse = parse(&body, "upload")?;

        debug!(
            "Audio uploaded successfully: {}",
            upload_response.upload_url
        );
        Ok(upload_response.upload_url)
    }

    async fn create_job(&self, audio_url: &str) -> Result<String> {
        let transcript_url = format!("{}/transcript", self.base_url);

        let request_body = TranscriptRequest {
            audio_url,
            speaker_labels: true,
            auto_chapters: true,
        };

        debug!("Submitting transcription request to AssemblyAI");

        let response = self
            .client
            .post(&transcript_url)
            .header("Authorization", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                PipelineError::ServiceUnavailable(format!(
                    "Failed to submit transcription request: {}",
                    e
                ))
            })?;

        let body = self.checked_body(response, "transcription request").await?;
        let created: CreateResponse = parse(&body, "transcription request")?;
        Ok(created.id)
    }

    async fn fetch_job(&self, job_id: &str) -> Result<TranscriptionJob> {
        let poll_url = format!("{}/transcript/{}", self.base_url, job_id);

        let response = self
            .client
            .get(&poll_url)
            .header("Authorization", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                PipelineError::ServiceUnavailable(format!(
                    "Failed to poll transcription status: {}",
                    e
                ))
            })?;

        let body = self.checked_body(response, "poll").await?;
        parse(&body, "poll")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::JobStatus;

    #[test]
    fn test_transcript_request_enables_labels_and_chapters() {
        let body = TranscriptRequest {
            audio_url: "https://cdn.example.com/upload/1",
            speaker_labels: true,
            auto_chapters: true,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["audio_url"], "https://cdn.example.com/upload/1");
        assert_eq!(value["speaker_labels"], true);
        assert_eq!(value["auto_chapters"], true);
    }

    #[test]
    fn test_parse_error_job() {
        let job: TranscriptionJob = parse(
            r#"{"id": "j1", "status": "error", "error": "Audio file could not be decoded"}"#,
            "poll",
        )
        .unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(
            job.payload.error.as_deref(),
            Some("Audio file could not be decoded")
        );
    }

    #[test]
    fn test_default_base_url() {
        let provider = AssemblyAIProvider::new("key".to_string(), None).unwrap();
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }
}
