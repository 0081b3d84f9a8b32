//! File listing command handlers.

use std::sync::Arc;
use std::time::Duration;

use tabled::Tabled;
use tokio::sync::mpsc;
use syncline_core::{CategoryFlags, FilterView, Snapshot, SyncClient, ViewFile, ViewFileStatus};

use crate::cli::{FilesArgs, FilesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Remote")]
    remote: String,
    #[tabled(rename = "Local")]
    local: String,
}

impl From<&Arc<ViewFile>> for FileRow {
    fn from(f: &Arc<ViewFile>) -> Self {
        Self {
            name: f.name.clone(),
            status: f.status.to_string(),
            kind: if f.is_dir { "dir" } else { "file" },
            remote: f.remote_size.map(|s| s.to_string()).unwrap_or_default(),
            local: f.local_size.map(|s| s.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct FilterRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Available")]
    enabled: &'static str,
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// "all" first, then every status in declaration order.
fn filter_rows(view: &FilterView<ViewFileStatus>) -> Vec<CategoryFlags<Option<ViewFileStatus>>> {
    std::iter::once(CategoryFlags {
        category: None,
        enabled: true,
        selected: view.all_selected,
    })
    .chain(view.categories.iter().map(|f| CategoryFlags {
        category: Some(f.category),
        enabled: f.enabled,
        selected: f.selected,
    }))
    .collect()
}

fn status_label(status: Option<ViewFileStatus>) -> String {
    status.map_or_else(|| "all".to_owned(), |s| s.to_string())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &SyncClient,
    args: FilesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        FilesCommand::List { status, wait } => {
            let model = first_model(client, status, wait).await?;
            let out = output::render_list(
                &global.output,
                &model.shown,
                |f| FileRow::from(f),
                |f| f.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FilesCommand::Filters { wait } => {
            let model = first_model(client, None, wait).await?;
            let rows = filter_rows(&model.view);
            let out = output::render_list(
                &global.output,
                &rows,
                |f| FilterRow {
                    status: status_label(f.category),
                    enabled: yes_no(f.enabled),
                },
                |f| status_label(f.category),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// The file collection as first pushed by the server.
struct Model {
    /// Files passing the status filter.
    shown: Snapshot<ViewFile>,
    view: Arc<FilterView<ViewFileStatus>>,
}

enum Arrival {
    Files(Model),
    Lost(Option<String>),
}

/// Select `status` on the client's status filter and read the result.
///
/// A status no file has cannot be selected; nothing is shown for it.
fn select(client: &SyncClient, status: Option<ViewFileStatus>) -> Model {
    let filter = client.status_filter();
    let selectable = filter.set_selected(status) || filter.selected() == status;
    let shown = if selectable {
        client.files().filtered()
    } else {
        Arc::new(Vec::new())
    };
    Model {
        shown,
        view: filter.current(),
    }
}

/// Connect and wait for the first file model the server pushes.
///
/// The selection happens inside the collection's change notification, so
/// the model is captured even when the stream ends and clears the
/// collection immediately afterwards.
async fn first_model(
    client: &SyncClient,
    status: Option<ViewFileStatus>,
    wait: u64,
) -> Result<Model, CliError> {
    let (tx, mut arrivals) = mpsc::unbounded_channel();
    let files_tx = tx.clone();
    let files_client = client.clone();
    let files = client.files().listen(move |_| {
        let _ = files_tx.send(Arrival::Files(select(&files_client, status)));
    });
    let _gate = client.connectivity().listen(move |state| {
        if !state.connected {
            let _ = tx.send(Arrival::Lost(state.error_message.clone()));
        }
    });
    client.connect().await?;

    let url = client.config().url.to_string();
    let arrival = tokio::time::timeout(Duration::from_secs(wait), arrivals.recv()).await;
    // The listener holds a client handle; release it before returning.
    files.unsubscribe();
    match arrival {
        Ok(Some(Arrival::Files(model))) => Ok(model),
        Ok(Some(Arrival::Lost(message))) => Err(CliError::ServerDown {
            url,
            message: message.unwrap_or_default(),
        }),
        Ok(None) => Err(CliError::Internal("file collection dropped".into())),
        Err(_) => Err(CliError::Timeout { url, seconds: wait }),
    }
}
