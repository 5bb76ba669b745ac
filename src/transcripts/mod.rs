//! Durable transcript files.
//!
//! Each processed meeting gets its own timestamped file. A separate "latest"
//! slot holds the most recent directly submitted transcript and is
//! overwritten on every submission.

use crate::error::Result;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

const LATEST_FILE: &str = "meeting.txt";

#[derive(Debug, Clone)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(LATEST_FILE)
    }

    /// Write a transcript under a fresh `meeting_<timestamp>.txt` name.
    pub async fn save_meeting(&self, transcript: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.generate_meeting_path();
        fs::write(&path, transcript).await?;
        info!("Saved transcript to {:?} ({} chars)", path, transcript.len());
        Ok(path)
    }

    pub async fn save_latest(&self, transcript: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.latest_path();
        fs::write(&path, transcript).await?;
        info!("Saved latest transcript to {:?}", path);
        Ok(path)
    }

    /// Contents of the latest slot, or `None` if nothing was submitted yet.
    pub async fn read_latest(&self) -> Result<Option<String>> {
        let path = self.latest_path();
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path).await?))
    }

    fn generate_meeting_path(&self) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = self.dir.join(format!("meeting_{}.txt", timestamp));

        // Two meetings in the same second get a counter suffix
        if path.exists() {
            for i in 1..100 {
                let alt_path = self.dir.join(format!("meeting_{}_{}.txt", timestamp, i));
                if !alt_path.exists() {
                    return alt_path;
                }
            }
        }

        path
    }
}
