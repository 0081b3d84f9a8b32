//! Auto-queue pattern command handlers.

use std::sync::Arc;

use tabled::Tabled;
use syncline_core::{AutoQueuePattern, FetchOutcome, ReactionExt, SyncClient};

use crate::cli::{GlobalOpts, PatternsArgs, PatternsCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PatternRow {
    #[tabled(rename = "Pattern")]
    pattern: String,
}

impl From<&Arc<AutoQueuePattern>> for PatternRow {
    fn from(p: &Arc<AutoQueuePattern>) -> Self {
        Self {
            pattern: p.pattern.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &SyncClient,
    args: PatternsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Add and remove validate against the server's current list.
    load(client).await?;

    match args.command {
        PatternsCommand::List => {
            let snap = client.patterns().snapshot();
            let out = output::render_list(
                &global.output,
                &snap,
                |p| PatternRow::from(p),
                |p| p.pattern.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PatternsCommand::Add { pattern } => {
            client.add_pattern(pattern.as_str()).await.into_result()?;
            if !global.quiet {
                eprintln!("Pattern '{pattern}' added");
            }
            Ok(())
        }

        PatternsCommand::Remove { pattern } => {
            client.remove_pattern(pattern.as_str()).await.into_result()?;
            if !global.quiet {
                eprintln!("Pattern '{pattern}' removed");
            }
            Ok(())
        }
    }
}

async fn load(client: &SyncClient) -> Result<(), CliError> {
    match client.patterns().refresh().await {
        FetchOutcome::Replaced(count) => {
            tracing::debug!(count, "patterns loaded");
            Ok(())
        }
        FetchOutcome::Failed { reason } => Err(CliError::ConnectionFailed {
            url: client.config().url.to_string(),
            reason,
        }),
        FetchOutcome::Stale => Err(CliError::Internal(
            "pattern list was reset while loading".into(),
        )),
    }
}
