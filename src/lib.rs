pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod extraction;
pub mod global;
pub mod history;
pub mod pipeline;
pub mod summary;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transcription;
pub mod transcripts;
