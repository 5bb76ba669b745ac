use anyhow::Result;

use super::args::{ContextCliArgs, HistoryCliArgs};
use crate::config::Config;
use crate::context::ContextBuilder;
use crate::history::{HistoryStore, MeetingRecord};

const PREVIEW_CHARS: usize = 100;

pub async fn handle_history_command(args: HistoryCliArgs) -> Result<()> {
    let config = Config::load()?;
    let store = HistoryStore::new(config.history_path()?);

    let records = match args.limit {
        Some(limit) => store.read_last_n(limit).await,
        None => store.read_all().await,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No meetings recorded yet.");
        return Ok(());
    }

    println!("Found {} meeting(s):\n", records.len());
    for record in &records {
        print_record(record);
    }

    Ok(())
}

pub async fn handle_context_command(args: ContextCliArgs) -> Result<()> {
    let config = Config::load()?;
    let builder = ContextBuilder::new(HistoryStore::new(config.history_path()?));

    let limit = args.limit.unwrap_or(config.memory.context_limit);
    let window = builder.build(limit).await;

    if window.rendered_text.is_empty() {
        println!("No prior meetings.");
    } else {
        println!("{}", window.rendered_text);
    }

    Ok(())
}

fn print_record(record: &MeetingRecord) {
    println!("Date: {}", record.timestamp);
    println!("Summary: {}", preview(&record.summary));
    for item in &record.action_items {
        println!(
            "  - {} (owner: {}, deadline: {})",
            item.task.as_deref().unwrap_or("?"),
            item.owner.as_deref().unwrap_or("-"),
            item.deadline.as_deref().unwrap_or("-"),
        );
    }
    println!("---");
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);

        assert_eq!(preview("short"), "short");
    }
}
