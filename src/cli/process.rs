use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::args::ProcessCliArgs;
use crate::app::build_pipeline;
use crate::config::Config;

pub async fn handle_process_command(args: ProcessCliArgs) -> Result<()> {
    if !args.file.exists() {
        bail!("File not found: {}", args.file.display());
    }

    let config = Config::load()?;
    let pipeline = build_pipeline(&config)?;

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            signal.cancel();
        }
    });

    let outcome = pipeline.process_file(&args.file, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
