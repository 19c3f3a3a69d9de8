//! `facesync serve`: websocket progress server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use facesync_core::config;
use facesync_daemon::start_blocking;

use super::SnapshotArgs;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides `listen_addr` in config.yaml).
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    #[command(flatten)]
    pub snapshot: SnapshotArgs,
}

impl ServeArgs {
    pub fn run(self) -> Result<()> {
        let mut config = config::load().context("failed to load config")?;
        if let Some(addr) = self.listen {
            config.listen_addr = addr;
        }
        let factory = Arc::new(self.snapshot.factory());
        start_blocking(config, factory).context("progress server exited with error")
    }
}
