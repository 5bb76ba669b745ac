use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use super::{Condenser, LengthBounds};
use crate::error::{PipelineError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Request body for a hosted summarization model
#[derive(Debug, Serialize)]
struct SummarizationRequest<'a> {
    inputs: &'a str,
    parameters: SummarizationParameters,
}

#[derive(Debug, Serialize)]
struct SummarizationParameters {
    min_length: usize,
    max_length: usize,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct SummarizationOutput {
    summary_text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Condenser backed by a hosted summarization model (inference-API style endpoint).
pub struct HttpCondenser {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl HttpCondenser {
    pub fn new(api_key: Option<String>, endpoint: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                PipelineError::ServiceUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        info!("Initialized condenser with endpoint: {}", endpoint);
        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }
}

#[async_trait]
impl Condenser for HttpCondenser {
    fn name(&self) -> &'static str {
        "hosted summarizer"
    }

    async fn condense(&self, text: &str, bounds: LengthBounds) -> Result<String> {
        let body = SummarizationRequest {
            inputs: text,
            parameters: SummarizationParameters {
                min_length: bounds.min_length,
                max_length: bounds.max_length,
                do_sample: false,
            },
        };

        debug!(
            "Condensing {} chars (min={}, max={})",
            text.len(),
            bounds.min_length,
            bounds.max_length
        );

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            PipelineError::ServiceUnavailable(format!("Condenser request failed: {}", e))
        })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            PipelineError::ServiceUnavailable(format!("Failed to read condenser response: {}", e))
        })?;

        if !status.is_success() {
            error!(
                "Condenser failed with status {}: {}",
                status, response_text
            );
            let reason = serde_json::from_str::<ErrorResponse>(&response_text)
                .map(|e| e.error)
                .unwrap_or(response_text);
            return Err(PipelineError::ServiceUnavailable(format!(
                "Condenser returned {}: {}",
                status, reason
            )));
        }

        parse_summary(&response_text)
    }
}

fn parse_summary(response_text: &str) -> Result<String> {
    let outputs: Vec<SummarizationOutput> = serde_json::from_str(response_text).map_err(|e| {
        PipelineError::ServiceUnavailable(format!("Failed to parse condenser response: {}", e))
    })?;

    outputs
        .into_iter()
        .next()
        .map(|o| o.summary_text)
        .ok_or_else(|| {
            PipelineError::ServiceUnavailable("Condenser returned no summary".to_string())
        })
}
