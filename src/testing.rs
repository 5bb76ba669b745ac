//! In-memory fakes for the external capabilities.
//!
//! Used by unit tests and by the integration tests under `tests/`.

use crate::context::ContextBuilder;
use crate::error::{PipelineError, Result};
use crate::extraction::{ActionItemExtractor, ChatRequest, ExtractionSettings, LanguageModel};
use crate::history::HistoryStore;
use crate::pipeline::MeetingPipeline;
use crate::summary::{Condenser, LengthBounds, Summarizer};
use crate::transcription::{JobStatus, TranscriptPayload, TranscriptionJob, TranscriptionService};
use crate::transcripts::TranscriptStore;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pipeline without a transcription service, keeping its history and
/// transcripts under `dir`.
pub fn text_pipeline(
    dir: &Path,
    condenser: Arc<dyn Condenser>,
    model: Arc<dyn LanguageModel>,
) -> MeetingPipeline {
    let history = HistoryStore::new(dir.join("meeting_history.json"));
    let extractor = ActionItemExtractor::new(
        model,
        ContextBuilder::new(history.clone()),
        ExtractionSettings::default(),
    );
    MeetingPipeline::new(
        history,
        Summarizer::new(condenser, LengthBounds::default()),
        extractor,
        None,
        TranscriptStore::new(dir.join("transcripts")),
        2,
    )
}

/// Condenser that returns a fixed string and records every call.
pub struct RecordingCondenser {
    output: String,
    calls: Mutex<Vec<(String, LengthBounds)>>,
}

impl RecordingCondenser {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, LengthBounds)> {
        guard(&self.calls).clone()
    }
}

#[async_trait]
impl Condenser for RecordingCondenser {
    fn name(&self) -> &'static str {
        "recording condenser"
    }

    async fn condense(&self, text: &str, bounds: LengthBounds) -> Result<String> {
        guard(&self.calls).push((text.to_string(), bounds));
        Ok(self.output.clone())
    }
}

pub struct FailingCondenser;

#[async_trait]
impl Condenser for FailingCondenser {
    fn name(&self) -> &'static str {
        "failing condenser"
    }

    async fn condense(&self, _text: &str, _bounds: LengthBounds) -> Result<String> {
        Err(PipelineError::ServiceUnavailable(
            "condenser unreachable".to_string(),
        ))
    }
}

/// Language model that always gives the same answer and records requests.
pub struct ScriptedModel {
    answer: String,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        guard(&self.requests).clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted model"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        guard(&self.requests).push(request.clone());
        Ok(self.answer.clone())
    }
}

pub struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    fn name(&self) -> &'static str {
        "failing model"
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<String> {
        Err(PipelineError::ServiceUnavailable(
            "language model unreachable".to_string(),
        ))
    }
}

enum JobOutcome {
    Complete(TranscriptPayload),
    Fail(String),
    Never,
}

/// Transcription service that reports `processing` for a fixed number of polls
/// before reaching its scripted terminal state.
pub struct ScriptedTranscriptionService {
    pending_polls: usize,
    outcome: JobOutcome,
    uploads: AtomicUsize,
    polls: AtomicUsize,
}

impl ScriptedTranscriptionService {
    fn with_outcome(pending_polls: usize, outcome: JobOutcome) -> Self {
        Self {
            pending_polls,
            outcome,
            uploads: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn completing_after(pending_polls: usize, payload: TranscriptPayload) -> Self {
        Self::with_outcome(pending_polls, JobOutcome::Complete(payload))
    }

    pub fn failing_with(reason: impl Into<String>) -> Self {
        Self::with_outcome(1, JobOutcome::Fail(reason.into()))
    }

    pub fn never_completing() -> Self {
        Self::with_outcome(0, JobOutcome::Never)
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionService for ScriptedTranscriptionService {
    fn name(&self) -> &'static str {
        "scripted transcription"
    }

    async fn upload(&self, audio_path: &Path) -> Result<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("memory://{}", audio_path.display()))
    }

    async fn create_job(&self, _audio_url: &str) -> Result<String> {
        Ok("job-1".to_string())
    }

    async fn fetch_job(&self, job_id: &str) -> Result<TranscriptionJob> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        let pending = TranscriptionJob {
            id: job_id.to_string(),
            status: JobStatus::Processing,
            payload: TranscriptPayload::default(),
        };

        if poll < self.pending_polls {
            return Ok(pending);
        }

        Ok(match &self.outcome {
            JobOutcome::Complete(payload) => TranscriptionJob {
                status: JobStatus::Completed,
                payload: payload.clone(),
                ..pending
            },
            JobOutcome::Fail(reason) => TranscriptionJob {
                status: JobStatus::Error,
                payload: TranscriptPayload {
                    error: Some(reason.clone()),
                    ..Default::default()
                },
                ..pending
            },
            JobOutcome::Never => pending,
        })
    }
}
