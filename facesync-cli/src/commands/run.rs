//! `facesync run`: one foreground sync against snapshot files.
//!
//! Progress events go to stdout as JSON lines, exactly as a websocket client
//! would receive them. Logs and the summary table go to stderr.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use facesync_core::{config, ServerEvent, SessionId, SyncOptions};
use facesync_daemon::init_tracing;
use facesync_sync::{run_with_handles, ChannelError, ProgressChannel, SessionHandles, SyncReport};

use super::SnapshotArgs;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Leave directory contacts that already have a photo untouched.
    #[arg(long)]
    pub keep_existing: bool,

    /// Session id used in logs and the summary.
    #[arg(long, default_value = "local")]
    pub session: String,

    /// Print the summary as JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub snapshot: SnapshotArgs,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let config = config::load().context("failed to load config")?;
        init_tracing();

        let clients = self
            .snapshot
            .factory()
            .load()
            .context("failed to load snapshot files")?;
        let handles = SessionHandles {
            channel: Arc::new(StdoutChannel::new()),
            messaging: clients.messaging,
            directory: clients.directory,
        };
        let session_id = SessionId::from(self.session.as_str());
        let options = SyncOptions::overwrite(!self.keep_existing);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        let report = runtime
            .block_on(run_with_handles(&session_id, handles, &options, &config))
            .context("photo sync failed")?;

        if self.json {
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to render report JSON")?
            );
        } else {
            print_summary(&report);
        }
        Ok(())
    }
}

/// Writes every event to stdout as a single JSON line.
#[derive(Debug)]
pub struct StdoutChannel {
    open: AtomicBool,
}

impl StdoutChannel {
    pub fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
        }
    }
}

impl Default for StdoutChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressChannel for StdoutChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send_event(&self, event: ServerEvent) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }
        let line = serde_json::to_string(&event)?;
        write_line(&line).map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

fn write_line(line: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "contacts")]
    label: &'static str,
    #[tabled(rename = "count")]
    count: String,
}

fn print_summary(report: &SyncReport) {
    let headline = if report.cancelled {
        format!("✗ session '{}' stopped early", report.session_id)
            .yellow()
            .bold()
    } else {
        format!("✓ session '{}' synced", report.session_id)
            .green()
            .bold()
    };
    eprintln!("{headline} in {} ms", report.duration_ms);

    let rows = vec![
        SummaryRow {
            label: "total",
            count: report.total_contacts.to_string(),
        },
        SummaryRow {
            label: "updated",
            count: report.updated.to_string(),
        },
        SummaryRow {
            label: "skipped (had photo)",
            count: report.skipped.to_string(),
        },
        SummaryRow {
            label: "unmatched",
            count: report.unmatched.to_string(),
        },
        SummaryRow {
            label: "no photo available",
            count: report.missing_photo.to_string(),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    eprintln!("{table}");
}
