//! History API routes.

use crate::api::AppState;
use crate::context::ContextWindow;
use crate::history::MeetingRecord;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

/// Query parameters for history and context lookups.
#[derive(Debug, Deserialize, Default)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/history", get(list_history))
        .route("/context", get(get_context))
        .with_state(state)
}

/// GET /history - Meeting records, oldest first. `limit` keeps only the most recent ones.
async fn list_history(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<MeetingRecord>> {
    let history = state.pipeline.history();
    let records = match params.limit {
        Some(limit) => history.read_last_n(limit).await,
        None => history.read_all().await,
    };
    Json(records)
}

/// GET /context - The context window the next meeting would be processed with.
async fn get_context(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Json<ContextWindow> {
    let limit = params.limit.unwrap_or(state.pipeline.context_limit());
    Json(state.pipeline.context().build(limit).await)
}

#[cfg(test)]
mod tests {
    use crate::api::{ApiServer, AppState};
    use crate::testing::{text_pipeline, RecordingCondenser, ScriptedModel};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    async fn get(state: &AppState, uri: &str) -> Value {
        let response = ApiServer::router(state.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_history_and_context_follow_processed_meetings() {
        let dir = TempDir::new().unwrap();
        let pipeline = text_pipeline(
            dir.path(),
            Arc::new(RecordingCondenser::new("unused")),
            Arc::new(ScriptedModel::new("[]")),
        );
        let state = AppState {
            pipeline: Arc::new(pipeline),
            shutdown: CancellationToken::new(),
        };

        assert_eq!(get(&state, "/history").await, serde_json::json!([]));
        assert_eq!(get(&state, "/context").await["rendered_text"], "");

        for text in ["Kickoff went well.", "Budget approved."] {
            state.pipeline.process_text(text).await.unwrap();
        }

        let all = get(&state, "/history").await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let last = get(&state, "/history?limit=1").await;
        assert_eq!(last.as_array().unwrap().len(), 1);
        assert_eq!(last[0]["summary"], "Budget approved.");

        let context = get(&state, "/context?limit=1").await;
        assert_eq!(context["rendered_text"], "Previous Summary: Budget approved.");
        assert_eq!(context["prior_summaries"], serde_json::json!(["Budget approved."]));
    }
}
