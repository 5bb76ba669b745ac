use anyhow::Result;
use clap::Parser;
use recap::{
    app,
    cli::{handle_context_command, handle_history_command, handle_process_command, Cli, CliCommand},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("Recap {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Process(args)) => {
            handle_process_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::History(args)) => {
            handle_history_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Context(args)) => {
            handle_context_command(args).await?;
            return Ok(());
        }
        None => {}
    }

    app::run_service().await
}
