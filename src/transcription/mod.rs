//! Transcription coordinator.
//!
//! Drives a remote asynchronous transcription job to completion:
//! upload → create job → poll until a terminal state → normalize.
//!
//! Polling has no built-in attempt limit. It is bounded by an optional
//! timeout and can be aborted at any point through a [`CancellationToken`];
//! both surface as [`PipelineError::TranscriptionFailed`].

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub mod providers;

pub use providers::AssemblyAIProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// One speaker-labelled segment of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub end: i64,
}

/// Auto-generated chapter summary returned alongside the transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chapter {
    pub summary: String,
    pub headline: String,
    pub gist: String,
    pub start: i64,
    pub end: i64,
}

/// Result fields of a transcription job. Everything is optional until the job completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptPayload {
    pub text: Option<String>,
    pub utterances: Option<Vec<Utterance>>,
    pub chapters: Option<Vec<Chapter>>,
    pub error: Option<String>,
}

impl TranscriptPayload {
    /// Summary of the first chapter, or empty when the service produced none.
    pub fn chapter_summary(&self) -> &str {
        self.chapters
            .as_deref()
            .and_then(|chapters| chapters.first())
            .map(|chapter| chapter.summary.as_str())
            .unwrap_or("")
    }
}

/// Snapshot of a remote job as returned by the polling endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(flatten)]
    pub payload: TranscriptPayload,
}

/// Remote asynchronous transcription service.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    fn name(&self) -> &'static str;

    /// Upload an audio file and return a URL the service can transcribe from.
    async fn upload(&self, audio_path: &Path) -> Result<String>;

    /// Request transcription (speaker labels and chapters enabled) and return the job id.
    async fn create_job(&self, audio_url: &str) -> Result<String>;

    async fn fetch_job(&self, job_id: &str) -> Result<TranscriptionJob>;
}

pub struct TranscriptionCoordinator {
    service: Arc<dyn TranscriptionService>,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl TranscriptionCoordinator {
    pub fn new(
        service: Arc<dyn TranscriptionService>,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            service,
            poll_interval,
            timeout,
        }
    }

    /// Upload the audio and start a job. Returns the job id.
    ///
    /// `cancel` aborts a stalled upload or job creation.
    pub async fn submit(&self, audio_path: &Path, cancel: &CancellationToken) -> Result<String> {
        info!(
            "Submitting {:?} for transcription via {}",
            audio_path,
            self.service.name()
        );

        let submission = async {
            let audio_url = self.service.upload(audio_path).await?;
            debug!("Audio uploaded: {}", audio_url);
            self.service.create_job(&audio_url).await
        };

        let job_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Transcription submission of {:?} cancelled", audio_path);
                return Err(PipelineError::TranscriptionFailed("cancelled".to_string()));
            }
            result = submission => result?,
        };

        info!("Transcription job submitted: {}", job_id);
        Ok(job_id)
    }

    /// Poll until the job completes or fails, honouring the timeout and `cancel`.
    pub async fn await_completion(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TranscriptPayload> {
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, self.poll_until_terminal(job_id))
                    .await
                    .map_err(|_| {
                        PipelineError::TranscriptionFailed(format!(
                            "timed out after {:?}",
                            limit
                        ))
                    })?,
                None => self.poll_until_terminal(job_id).await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Transcription job {} cancelled", job_id);
                Err(PipelineError::TranscriptionFailed("cancelled".to_string()))
            }
            result = bounded => result,
        }
    }

    /// `submit` followed by `await_completion`.
    pub async fn transcribe(
        &self,
        audio_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<TranscriptPayload> {
        let job_id = self.submit(audio_path, cancel).await?;
        self.await_completion(&job_id, cancel).await
    }

    async fn poll_until_terminal(&self, job_id: &str) -> Result<TranscriptPayload> {
        let mut last_status: Option<JobStatus> = None;
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            let job = self.service.fetch_job(job_id).await?;

            if last_status != Some(job.status) {
                info!("Transcription job {} status: {}", job_id, job.status.as_str());
                last_status = Some(job.status);
            }

            match job.status {
                JobStatus::Completed => {
                    info!(
                        "Transcription job {} completed after {} poll(s)",
                        job_id, attempt
                    );
                    return Ok(job.payload);
                }
                JobStatus::Error => {
                    let reason = job
                        .payload
                        .error
                        .unwrap_or_else(|| "Unknown error".to_string());
                    error!("Transcription job {} failed: {}", job_id, reason);
                    return Err(PipelineError::TranscriptionFailed(reason));
                }
                JobStatus::Queued | JobStatus::Processing | JobStatus::Unknown => {
                    debug!("Transcription job {} still pending (poll {})", job_id, attempt);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

/// Flatten a payload into one transcript string.
///
/// Speaker-labelled utterances win (`"{speaker}: {text}"`, one per line);
/// otherwise the flat text field, or empty.
pub fn normalize(payload: &TranscriptPayload) -> String {
    match payload.utterances.as_deref() {
        Some(utterances) if !utterances.is_empty() => utterances
            .iter()
            .map(|u| format!("{}: {}\n", u.speaker, u.text))
            .collect(),
        _ => payload.text.clone().unwrap_or_default(),
    }
}
