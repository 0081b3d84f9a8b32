//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod files;
pub mod patterns;
pub mod status;

use syncline_core::{ClientConfig, SyncClient};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a server-facing command to its handler.
pub async fn dispatch(
    cmd: Command,
    config: ClientConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Patterns(args) => {
            let client = SyncClient::new(config)?;
            patterns::handle(&client, args, global).await
        }
        Command::Status(args) => status::handle(config, args, global).await,
        Command::Files(args) => {
            let client = SyncClient::new(config)?;
            let result = files::handle(&client, args, global).await;
            client.disconnect().await;
            result
        }
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need a server connection".into(),
        )),
    }
}
