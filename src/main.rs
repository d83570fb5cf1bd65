//! themebuild - theme/asset build pipeline.
//!
//! Compiles SCSS theme sources into deployable stylesheets, produces
//! right-to-left variants of every theme, vendors third-party front-end
//! packages into the public assets tree and drives a live-reload
//! development session.

mod build;
mod cli;
mod compiler;
mod config;
mod direction;
mod install;
mod reload;
mod serve;
mod sources;
mod utils;
mod watch;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config: &'static Config = Box::leak(Box::new(Config::from_cli(&cli)?));

    match cli.command {
        // Independent entry point for external tooling that only wants
        // compilation-on-change, without the orchestrated flow.
        Some(Commands::Watch) => watch::watch_blocking(config, None),
        None => dispatch(config),
    }
}

/// Top-level mode dispatch. First match wins:
/// install, then sync-only (which needs a proxy target), then the
/// default clean-build-sync-RTL flow.
fn dispatch(config: &'static Config) -> Result<()> {
    if config.install {
        install::install_assets(config)
    } else if config.sync_only && config.proxy.is_some() {
        serve::sync_only(config)
    } else {
        build::run_pipeline(config)
    }
}
