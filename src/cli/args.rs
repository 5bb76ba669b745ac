use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "recap")]
#[command(about = "Meeting memory: summaries and action items with prior context", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Process a meeting recording (mp3, wav, m4a) or transcript (txt)
    Process(ProcessCliArgs),
    /// Show stored meeting records
    History(HistoryCliArgs),
    /// Show the context the next meeting would be processed with
    Context(ContextCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ProcessCliArgs {
    /// Path to the recording or transcript
    pub file: PathBuf,
}

#[derive(ClapArgs, Debug)]
pub struct HistoryCliArgs {
    /// Only show the most recent N meetings
    #[arg(short, long)]
    pub limit: Option<usize>,
    /// Print raw JSON instead of a listing
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ContextCliArgs {
    /// Number of prior meetings to include (defaults to the configured limit)
    #[arg(short, long)]
    pub limit: Option<usize>,
}
