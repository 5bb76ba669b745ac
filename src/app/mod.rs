use crate::api::{ApiServer, AppState};
use crate::config::Config;
use crate::context::ContextBuilder;
use crate::extraction::{ActionItemExtractor, ChatCompletionsClient, ExtractionSettings};
use crate::history::HistoryStore;
use crate::pipeline::MeetingPipeline;
use crate::summary::{HttpCondenser, LengthBounds, Summarizer};
use crate::transcription::{AssemblyAIProvider, TranscriptionCoordinator};
use crate::transcripts::TranscriptStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub async fn run_service() -> Result<()> {
    info!("Starting Recap service");

    let config = Config::load()?;
    let pipeline = Arc::new(build_pipeline(&config)?);

    let shutdown = CancellationToken::new();
    let state = AppState {
        pipeline,
        shutdown: shutdown.clone(),
    };

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown requested, cancelling in-flight transcriptions");
        signal.cancel();
    });

    info!("Recap is ready!");
    info!(
        "Try: curl -F file=@notes.txt http://127.0.0.1:{}/transcribe",
        config.server.port
    );

    ApiServer::new(config.server.port, state).start().await
}

/// Wire every pipeline stage from configuration.
pub fn build_pipeline(config: &Config) -> Result<MeetingPipeline> {
    let history = HistoryStore::new(config.history_path()?);
    info!("Meeting history: {:?}", history.path());

    let transcripts = TranscriptStore::new(config.transcripts_dir()?);

    let condenser = Arc::new(HttpCondenser::new(
        config.condenser.api_key.clone(),
        config.condenser.api_endpoint.clone(),
    )?);
    let summarizer = Summarizer::new(
        condenser,
        LengthBounds {
            min_length: config.condenser.min_length,
            max_length: config.condenser.max_length,
        },
    );

    if config.llm.api_key.is_none() {
        warn!("No language model API key configured; action item extraction may fail");
    }
    let model = Arc::new(ChatCompletionsClient::new(
        config.llm.api_key.clone(),
        config.llm.api_endpoint.clone(),
        config.llm.model.clone(),
    )?);
    let extractor = ActionItemExtractor::new(
        model,
        ContextBuilder::new(history.clone()),
        ExtractionSettings {
            context_limit: config.memory.context_limit,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        },
    );

    let transcription = build_transcription(config)?;

    Ok(MeetingPipeline::new(
        history,
        summarizer,
        extractor,
        transcription,
        transcripts,
        config.memory.context_limit,
    ))
}

fn build_transcription(config: &Config) -> Result<Option<TranscriptionCoordinator>> {
    let Some(api_key) = config.transcription.api_key.clone() else {
        warn!("No transcription API key configured; audio input is disabled");
        return Ok(None);
    };

    let provider = AssemblyAIProvider::new(
        api_key,
        Some(config.transcription.api_endpoint.clone()),
    )?;
    Ok(Some(TranscriptionCoordinator::new(
        Arc::new(provider),
        Duration::from_secs(config.transcription.poll_interval_secs),
        config.transcription.timeout_secs.map(Duration::from_secs),
    )))
}
