pub mod args;
pub mod history;
pub mod process;

pub use args::{Cli, CliCommand, ContextCliArgs, HistoryCliArgs, ProcessCliArgs};
pub use history::{handle_context_command, handle_history_command};
pub use process::handle_process_command;
