//! Server status command handlers.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use syncline_api::{EventStreamClient, StreamEvent, StreamHandler, join_path};
use syncline_core::{
    ClientConfig, ConnectivityGate, ConnectivityState, CoreError, English, StatusStreamHandler,
    SyncClient,
};

use crate::cli::{GlobalOpts, StatusArgs, StatusCommand};
use crate::error::CliError;
use crate::output;

// ── Display model ───────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusView {
    server: String,
    #[serde(flatten)]
    state: ConnectivityState,
}

fn detail(view: &StatusView, color: bool) -> String {
    let mut out = format!(
        "Server:  {}\nStatus:  {}",
        view.server,
        output::paint_up(view.state.connected, color)
    );
    if let Some(ref message) = view.state.error_message {
        out.push_str(&format!("\nReason:  {message}"));
    }
    if let Some(at) = view.state.changed_at {
        out.push_str(&format!("\nSince:   {}", at.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    out
}

fn line(view: &StatusView, color: bool) -> String {
    let at = view
        .state
        .changed_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    match view.state.error_message {
        Some(ref message) => format!(
            "{at} {} {message}",
            output::paint_up(view.state.connected, color)
        ),
        None => format!("{at} {}", output::paint_up(view.state.connected, color)),
    }
}

// ── First status ────────────────────────────────────────────────────

/// Captures the gate state after the first status report or stream
/// failure and wakes the waiter.
struct FirstStatus {
    gate: Arc<ConnectivityGate>,
    inner: StatusStreamHandler,
    first: Arc<OnceLock<ConnectivityState>>,
    reported: Arc<Notify>,
}

impl FirstStatus {
    fn settle(&self) {
        if self.first.set(self.gate.current()).is_ok() {
            self.reported.notify_one();
        }
    }
}

impl StreamHandler for FirstStatus {
    fn on_event(&self, event: &StreamEvent) {
        if self.inner.apply(event) {
            self.settle();
        }
    }

    fn on_error(&self, error: &syncline_api::Error) {
        tracing::debug!(error = %error, "status stream failed");
        self.inner.on_error(error);
        self.settle();
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    config: ClientConfig,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        StatusCommand::Show { wait } => show(&config, wait, global).await,
        StatusCommand::Watch { count, retry_ms } => {
            let mut config = config;
            if let Some(ms) = retry_ms {
                config.stream_retry_interval = Duration::from_millis(ms);
            }
            watch(config, count, global).await
        }
    }
}

async fn show(config: &ClientConfig, wait: u64, global: &GlobalOpts) -> Result<(), CliError> {
    let stream = join_path(&config.url, &config.endpoints.status_stream)
        .and_then(|url| EventStreamClient::new(url, &config.transport(), config.stream()))
        .map_err(CoreError::from)?;

    let gate = Arc::new(ConnectivityGate::new());
    let first = Arc::new(OnceLock::new());
    let reported = Arc::new(Notify::new());
    let waiter = FirstStatus {
        gate: Arc::clone(&gate),
        inner: StatusStreamHandler::new(Arc::clone(&gate), Arc::new(English)),
        first: Arc::clone(&first),
        reported: Arc::clone(&reported),
    };

    let handle = stream.open(waiter, CancellationToken::new());
    let outcome = tokio::time::timeout(Duration::from_secs(wait), reported.notified()).await;
    handle.shutdown().await;

    let Some(state) = first.get().filter(|_| outcome.is_ok()).cloned() else {
        return Err(CliError::Timeout {
            url: config.url.to_string(),
            seconds: wait,
        });
    };
    if !state.connected {
        return Err(CliError::ServerDown {
            url: config.url.to_string(),
            message: state.error_message.unwrap_or_default(),
        });
    }

    let view = StatusView {
        server: config.url.to_string(),
        state,
    };
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(v, color),
        |v| output::paint_up(v.state.connected, false),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn watch(
    config: ClientConfig,
    count: Option<usize>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let server = config.url.to_string();
    let client = SyncClient::new(config)?;

    // One message per transition.
    let (tx, mut transitions) = mpsc::unbounded_channel();
    let _guard = client.connectivity().listen(move |state| {
        let _ = tx.send(state.clone());
    });
    client.connect().await?;

    let color = output::should_color(&global.color);
    let mut seen = 0usize;
    let result = loop {
        if count.is_some_and(|limit| seen >= limit) {
            break Ok(());
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            next = transitions.recv() => {
                let Some(state) = next else {
                    break Err(CliError::Internal("connectivity gate dropped".into()));
                };
                seen += 1;
                let view = StatusView { server: server.clone(), state };
                match output::render_single(
                    &global.output,
                    &view,
                    |v| line(v, color),
                    |v| output::paint_up(v.state.connected, false),
                ) {
                    Ok(out) => output::print_output(&out, global.quiet),
                    Err(e) => break Err(e),
                }
            }
        }
    };

    client.disconnect().await;
    result
}
