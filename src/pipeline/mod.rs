//! Meeting pipeline orchestrator.
//!
//! Sequences one incoming meeting through the pipeline:
//! transcript → summarize → context → rollup → action items → persist → respond
//!
//! Failure policy lives here and nowhere else:
//! - transcription, condenser and storage failures propagate to the caller
//! - action item extraction failures degrade to an empty list
//! - unsupported input is rejected before any external call

use crate::context::ContextBuilder;
use crate::error::{PipelineError, Result};
use crate::extraction::ActionItemExtractor;
use crate::history::{ActionItem, HistoryStore, MeetingRecord};
use crate::summary::{truncate_chars, Summarizer, MAX_INPUT_CHARS};
use crate::transcription::{normalize, TranscriptionCoordinator};
use crate::transcripts::TranscriptStore;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a"];
const TEXT_EXTENSIONS: &[&str] = &["txt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Audio,
    Text,
}

impl InputKind {
    /// Classify an input by its file extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            Ok(Self::Audio)
        } else if TEXT_EXTENSIONS.contains(&extension.as_str()) {
            Ok(Self::Text)
        } else {
            Err(PipelineError::UnsupportedInput(format!(
                "Unsupported file type: {:?}",
                name
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySection {
    pub summary: String,
    pub headline: String,
    pub gist: String,
    pub start: i64,
    pub end: i64,
}

impl SummarySection {
    fn combined(summary: String) -> Self {
        Self {
            summary,
            headline: "Combined Summary".to_string(),
            gist: "Main Idea".to_string(),
            start: 0,
            end: 0,
        }
    }
}

/// Response payload for one processed meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingOutcome {
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub transcript: String,
    pub summary: Vec<SummarySection>,
    pub action_items: Vec<ActionItem>,
}

impl MeetingOutcome {
    pub fn combined_summary(&self) -> &str {
        self.summary
            .first()
            .map(|section| section.summary.as_str())
            .unwrap_or("")
    }
}

pub struct MeetingPipeline {
    history: HistoryStore,
    context: ContextBuilder,
    summarizer: Summarizer,
    extractor: ActionItemExtractor,
    transcription: Option<TranscriptionCoordinator>,
    transcripts: TranscriptStore,
    context_limit: usize,
}

impl MeetingPipeline {
    pub fn new(
        history: HistoryStore,
        summarizer: Summarizer,
        extractor: ActionItemExtractor,
        transcription: Option<TranscriptionCoordinator>,
        transcripts: TranscriptStore,
        context_limit: usize,
    ) -> Self {
        Self {
            context: ContextBuilder::new(history.clone()),
            history,
            summarizer,
            extractor,
            transcription,
            transcripts,
            context_limit,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn context(&self) -> &ContextBuilder {
        &self.context
    }

    pub fn context_limit(&self) -> usize {
        self.context_limit
    }

    pub fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    /// Process a file on disk, choosing the audio or text path by extension.
    pub async fn process_file(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<MeetingOutcome> {
        let name = path.to_string_lossy();
        match InputKind::from_file_name(&name)? {
            InputKind::Audio => self.process_audio(path, cancel).await,
            InputKind::Text => {
                let bytes = tokio::fs::read(path).await?;
                let text = decode_text(bytes)?;
                self.process_text(&text).await
            }
        }
    }

    /// Process an uploaded resource given its original file name and contents.
    pub async fn process_upload(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<MeetingOutcome> {
        match InputKind::from_file_name(file_name)? {
            InputKind::Audio => {
                let extension = Path::new(file_name)
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                let mut staged = tempfile::Builder::new()
                    .prefix("recap-upload-")
                    .suffix(&format!(".{}", extension))
                    .tempfile()?;
                staged.write_all(&contents)?;
                staged.flush()?;

                // The staged file is removed when `staged` drops.
                self.process_audio(staged.path(), cancel).await
            }
            InputKind::Text => {
                let text = decode_text(contents)?;
                self.process_text(&text).await
            }
        }
    }

    /// Audio path: transcribe remotely, then summarize the chapter summary.
    pub async fn process_audio(
        &self,
        audio_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<MeetingOutcome> {
        let coordinator = self.transcription.as_ref().ok_or_else(|| {
            PipelineError::ServiceUnavailable("No transcription service configured".to_string())
        })?;

        info!("Processing audio meeting: {:?}", audio_path);
        let job_id = coordinator.submit(audio_path, cancel).await?;
        let payload = coordinator.await_completion(&job_id, cancel).await?;
        let transcript = normalize(&payload);

        self.transcripts.save_meeting(&transcript).await?;

        let window = self.context.build(self.context_limit).await;
        let combined_summary = self
            .summarizer
            .rollup(payload.chapter_summary(), &window.prior_summaries)
            .await?;

        self.finish(InputKind::Audio, transcript, combined_summary)
            .await
    }

    /// Text path: condense the text itself, then roll it up.
    pub async fn process_text(&self, text: &str) -> Result<MeetingOutcome> {
        let text = truncate_chars(text, MAX_INPUT_CHARS);
        self.transcripts.save_meeting(text).await?;
        self.summarize_text(text).await
    }

    /// Run the text path on the transcript in the "latest" slot.
    ///
    /// Returns `Ok(None)` when nothing has been submitted yet.
    pub async fn process_latest(&self) -> Result<Option<MeetingOutcome>> {
        match self.transcripts.read_latest().await? {
            Some(text) => Ok(Some(self.summarize_text(&text).await?)),
            None => Ok(None),
        }
    }

    async fn summarize_text(&self, text: &str) -> Result<MeetingOutcome> {
        let text = truncate_chars(text, MAX_INPUT_CHARS).to_string();
        info!("Processing text meeting: {} chars", text.len());

        let summary_text = self.summarizer.condense_document(&text).await?;
        let window = self.context.build(self.context_limit).await;
        let combined_summary = self
            .summarizer
            .rollup(&summary_text, &window.prior_summaries)
            .await?;

        self.finish(InputKind::Text, text, combined_summary).await
    }

    async fn finish(
        &self,
        kind: InputKind,
        transcript: String,
        combined_summary: String,
    ) -> Result<MeetingOutcome> {
        let action_items = best_effort(self.extractor.extract(&transcript).await);

        self.history
            .append(MeetingRecord::new(
                combined_summary.clone(),
                action_items.clone(),
            ))
            .await?;

        info!(
            "Meeting processed: {} chars of transcript, {} action item(s)",
            transcript.len(),
            action_items.len()
        );

        Ok(MeetingOutcome {
            kind,
            transcript,
            summary: vec![SummarySection::combined(combined_summary)],
            action_items,
        })
    }
}

/// Extraction is enrichment: any failure becomes an empty list.
fn best_effort(result: Result<Vec<ActionItem>>) -> Vec<ActionItem> {
    match result {
        Ok(items) => items,
        Err(err) => {
            warn!(
                "Action item extraction failed, continuing without action items: {}",
                err
            );
            Vec::new()
        }
    }
}

fn decode_text(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| {
        PipelineError::UnsupportedInput("Text input is not valid UTF-8".to_string())
    })
}
