//! Context window built from the most recent meetings.

use crate::history::{HistoryStore, MeetingRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CONTEXT_LIMIT: usize = 2;

/// Rendered slice of recent history. Recomputed per request, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    pub rendered_text: String,
    pub prior_summaries: Vec<String>,
}

#[derive(Clone)]
pub struct ContextBuilder {
    store: HistoryStore,
}

impl ContextBuilder {
    pub fn new(store: HistoryStore) -> Self {
        Self { store }
    }

    pub async fn build(&self, limit: usize) -> ContextWindow {
        let recent = self.store.read_last_n(limit).await;
        let window = render(&recent);
        debug!(
            "Built context window from {} record(s): {} chars",
            recent.len(),
            window.rendered_text.len()
        );
        window
    }
}

/// Render records oldest first. Missing action item fields become empty text.
pub fn render(records: &[MeetingRecord]) -> ContextWindow {
    let mut lines = Vec::new();
    let mut prior_summaries = Vec::with_capacity(records.len());

    for record in records {
        prior_summaries.push(record.summary.clone());
        lines.push(format!("Previous Summary: {}", record.summary));
        for item in &record.action_items {
            lines.push(format!(
                "Action: {} | Owner: {} | Deadline: {}",
                item.task.as_deref().unwrap_or(""),
                item.owner.as_deref().unwrap_or(""),
                item.deadline.as_deref().unwrap_or(""),
            ));
        }
    }

    ContextWindow {
        rendered_text: lines.join("\n").trim_end().to_string(),
        prior_summaries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ActionItem;
    use tempfile::TempDir;

    #[test]
    fn test_render_empty_history() {
        let window = render(&[]);
        assert_eq!(window.rendered_text, "");
        assert!(window.prior_summaries.is_empty());
    }

    #[test]
    fn test_render_summary_and_actions() {
        let records = vec![MeetingRecord::new(
            "Kickoff held",
            vec![
                ActionItem::new("Write report", "Alice", "Friday"),
                ActionItem {
                    task: Some("Review".to_string()),
                    owner: None,
                    deadline: None,
                },
            ],
        )];

        let window = render(&records);
        assert_eq!(
            window.rendered_text,
            "Previous Summary: Kickoff held\n\
             Action: Write report | Owner: Alice | Deadline: Friday\n\
             Action: Review | Owner:  | Deadline:"
        );
        assert_eq!(window.prior_summaries, vec!["Kickoff held"]);
    }

    #[tokio::test]
    async fn test_build_uses_only_last_records_in_order() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        for summary in ["one", "two", "three"] {
            store
                .append(MeetingRecord::new(summary, Vec::new()))
                .await
                .unwrap();
        }

        let window = ContextBuilder::new(store).build(2).await;
        assert_eq!(window.prior_summaries, vec!["two", "three"]);
        assert_eq!(
            window.rendered_text,
            "Previous Summary: two\nPrevious Summary: three"
        );
    }
}
