//! Action item extraction.
//!
//! Asks a language model for a JSON array of `{task, owner, deadline}`
//! objects, biased by the recent meeting context. The extractor reports
//! every failure as an error; whether a failure is fatal is decided by the
//! caller (the pipeline degrades to an empty list).

use crate::context::ContextBuilder;
use crate::error::{PipelineError, Result};
use crate::history::ActionItem;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

pub mod chat_client;

pub use chat_client::ChatCompletionsClient;

const SYSTEM_PROMPT: &str = "You are an expert meeting assistant.";

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?").expect("code fence pattern is valid")
});

/// A chat-style request: one system turn and one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Language-understanding capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Free-text answer to the request.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractionSettings {
    pub context_limit: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            context_limit: crate::context::DEFAULT_CONTEXT_LIMIT,
            temperature: 0.3,
            max_tokens: 500,
        }
    }
}

#[derive(Clone)]
pub struct ActionItemExtractor {
    model: Arc<dyn LanguageModel>,
    context: ContextBuilder,
    settings: ExtractionSettings,
}

impl ActionItemExtractor {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        context: ContextBuilder,
        settings: ExtractionSettings,
    ) -> Self {
        Self {
            model,
            context,
            settings,
        }
    }

    pub async fn extract(&self, transcript: &str) -> Result<Vec<ActionItem>> {
        let window = self.context.build(self.settings.context_limit).await;
        let request = ChatRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: build_prompt(&window.rendered_text, transcript),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        info!(
            "Extracting action items from {} chars via {}",
            transcript.len(),
            self.model.name()
        );
        let answer = self.model.complete(&request).await?;
        debug!("Raw extraction answer: {}", answer);

        let items = parse_action_items(&answer)?;
        info!("Extracted {} action item(s)", items.len());
        Ok(items)
    }
}

pub fn build_prompt(context: &str, transcript: &str) -> String {
    format!(
        "Based on the following meeting transcript and the context from past meetings, \
         extract clear action items.\n\
         Each action item must have:\n\
         1. Task\n\
         2. Owner\n\
         3. Deadline\n\n\
         Answer with a JSON array of objects with the keys \"task\", \"owner\" and \"deadline\".\n\n\
         {}\n\nCurrent Transcript:\n{}\n",
        context, transcript
    )
}

/// Remove markdown code fences (with or without a `json` tag) and surrounding whitespace.
pub fn strip_code_fences(answer: &str) -> String {
    CODE_FENCE.replace_all(answer.trim(), "").trim().to_string()
}

/// Parse the model's answer into action items.
///
/// Elements that are not JSON objects are skipped; anything that is not a
/// JSON array is a [`PipelineError::MalformedExtraction`].
pub fn parse_action_items(answer: &str) -> Result<Vec<ActionItem>> {
    let cleaned = strip_code_fences(answer);
    let value: serde_json::Value = serde_json::from_str(&cleaned)
        .map_err(|e| PipelineError::MalformedExtraction(format!("not valid JSON: {}", e)))?;

    let serde_json::Value::Array(elements) = value else {
        return Err(PipelineError::MalformedExtraction(
            "expected a JSON array of action items".to_string(),
        ));
    };

    let items = elements
        .into_iter()
        .filter(|element| element.is_object())
        .filter_map(|element| serde_json::from_value::<ActionItem>(element).ok())
        .collect();
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryStore, MeetingRecord};
    use crate::testing::{FailingModel, ScriptedModel};
    use tempfile::TempDir;

    fn extractor(dir: &TempDir, model: Arc<dyn LanguageModel>) -> (ActionItemExtractor, HistoryStore) {
        let store = HistoryStore::new(dir.path().join("history.json"));
        let extractor = ActionItemExtractor::new(
            model,
            ContextBuilder::new(store.clone()),
            ExtractionSettings::default(),
        );
        (extractor, store)
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("```\n[1]\n```  "), "[1]");
        assert_eq!(strip_code_fences("[]"), "[]");
    }

    #[test]
    fn test_parse_fenced_array() {
        let answer = "```json\n[{\"task\": \"Finish report\", \"owner\": \"Alice\", \"deadline\": \"Friday\"}]\n```";
        let items = parse_action_items(answer).unwrap();
        assert_eq!(items, vec![ActionItem::new("Finish report", "Alice", "Friday")]);
    }

    #[test]
    fn test_parse_keeps_partial_objects_and_skips_scalars() {
        let answer = r#"[{"task": "Review"}, "noise", 3, {"owner": "Bob", "deadline": null}]"#;
        let items = parse_action_items(answer).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].task.as_deref(), Some("Review"));
        assert!(items[0].owner.is_none());
        assert_eq!(items[1].owner.as_deref(), Some("Bob"));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        let err = parse_action_items(r#"{"task": "x"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedExtraction(_)));

        let err = parse_action_items("Sure! Here are the items:").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedExtraction(_)));
    }

    #[tokio::test]
    async fn test_prompt_embeds_context_and_transcript() {
        let dir = TempDir::new().unwrap();
        let model = Arc::new(ScriptedModel::new("[]"));
        let (extractor, store) = extractor(&dir, model.clone());
        store
            .append(MeetingRecord::new(
                "Budget approved",
                vec![ActionItem::new("Send invoice", "Carol", "Monday")],
            ))
            .await
            .unwrap();

        let items = extractor.extract("Dave will book the venue.").await.unwrap();
        assert!(items.is_empty());

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.system, SYSTEM_PROMPT);
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.max_tokens, 500);
        assert!(request.user.contains("Previous Summary: Budget approved"));
        assert!(request
            .user
            .contains("Action: Send invoice | Owner: Carol | Deadline: Monday"));
        assert!(request
            .user
            .contains("Current Transcript:\nDave will book the venue."));
    }

    #[tokio::test]
    async fn test_model_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let (extractor, _) = extractor(&dir, Arc::new(FailingModel));
        let err = extractor.extract("anything").await.unwrap_err();
        assert!(matches!(err, PipelineError::ServiceUnavailable(_)));
    }
}
