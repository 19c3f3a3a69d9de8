//! `facesync config`: show or initialize the config file.

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use facesync_core::{config, Config};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as JSON.
    Show,
    /// Write a config file with default values.
    Init {
        /// Replace an existing config file.
        #[arg(long)]
        force: bool,
    },
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;

    match command {
        ConfigCommand::Show => {
            let config = config::load_at(&home).context("failed to load config")?;
            let path = config::config_path_at(&home);
            let source = if path.exists() {
                path.display().to_string()
            } else {
                "defaults".to_string()
            };
            println!("# source: {source}");
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("failed to render config JSON")?
            );
        }
        ConfigCommand::Init { force } => {
            let path = config::config_path_at(&home);
            if path.exists() && !force {
                bail!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                );
            }
            let path = config::save_at(&home, &Config::default())
                .context("failed to write config")?;
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}
