//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// themebuild theme pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Project root containing theme sources and the package manifest
    #[arg(long, default_value = "./")]
    pub root: PathBuf,

    /// Development mode: skip minification and source maps, push compiled
    /// stylesheets to connected browsers. An optional value is treated as
    /// a proxy target (`--dev 8080` implies `--proxy 8080`).
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub dev: Option<String>,

    /// Explicit build flag: in dev mode, also write compiled output to disk
    #[arg(short = 'b', long)]
    pub build: bool,

    /// Run only the live-reload proxy session plus the source watcher,
    /// against an already-built theme output
    #[arg(long = "sync-only")]
    pub sync_only: bool,

    /// Proxy target port, combined with the fixed local host 127.0.0.1
    #[arg(short, long)]
    pub proxy: Option<String>,

    /// Vendor third-party packages into the public assets directory
    #[arg(short, long)]
    pub install: bool,

    /// Package manifest path, relative to the root
    #[arg(long, default_value = "package.json")]
    pub manifest: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Watch theme sources and recompile on change (no proxy session)
    Watch,
}
