//! Pipeline configuration.
//!
//! A [`Config`] is built once from parsed CLI arguments and is immutable
//! afterwards. Every component takes it by reference; nothing writes back
//! into it. The list of all discovered theme sources is an explicit return
//! value of [`crate::direction::DirectionalWindow::acquire`], not a config
//! field.

use crate::cli::Cli;
use anyhow::Result;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("project root `{0}` does not exist")]
    MissingRoot(PathBuf),
}

/// Glob patterns and paths locating the stylesheet sources.
#[derive(Debug, Clone)]
pub struct SourcePatterns {
    /// Standard themes: `interface/themes/style_*.scss`
    pub style_standard: String,

    /// Color themes, nested one level deeper: `interface/themes/colors/*.scss`
    pub style_color: String,

    /// The shared directional stylesheet whose layout-direction default
    /// is toggled for the RTL compilation window.
    pub directional: PathBuf,
}

/// Process-wide configuration, read-only after construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub dev: bool,
    pub build: bool,
    pub sync_only: bool,
    /// Proxy target port; the session proxies `127.0.0.1:<port>`.
    pub proxy: Option<String>,
    pub install: bool,

    pub root: PathBuf,
    /// Package descriptor the asset installer reads.
    pub manifest: PathBuf,
    /// Where installed packages live on disk.
    pub modules_dir: PathBuf,
    /// Directory holding theme sources and hand-authored theme files.
    pub themes_dir: PathBuf,
    pub src: SourcePatterns,

    /// Vendored third-party assets land here, namespaced by package name.
    pub assets_out: PathBuf,
    /// Compiled theme stylesheets land here.
    pub themes_out: PathBuf,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = cli.root.clone();
        if !root.is_dir() {
            return Err(ConfigError::MissingRoot(root).into());
        }

        let (dev, proxy) = ingest(cli.dev.as_deref(), cli.proxy.clone());
        let themes_dir = root.join("interface/themes");

        Ok(Self {
            dev,
            build: cli.build,
            sync_only: cli.sync_only,
            proxy,
            install: cli.install,
            manifest: root.join(&cli.manifest),
            modules_dir: root.join("node_modules"),
            src: SourcePatterns {
                style_standard: pattern(&themes_dir, "style_*.scss"),
                style_color: pattern(&themes_dir, "colors/*.scss"),
                directional: themes_dir.join("directional.scss"),
            },
            assets_out: root.join("public/assets"),
            themes_out: root.join("public/themes"),
            themes_dir,
            root,
        })
    }
}

fn pattern(dir: &Path, tail: &str) -> String {
    format!("{}/{tail}", dir.display())
}

/// Normalize the dev flag. A bare `--dev` enables dev mode; a non-boolean
/// value (`--dev 8080`) enables dev mode and carries the proxy target,
/// overriding any `--proxy` argument.
fn ingest(dev: Option<&str>, proxy: Option<String>) -> (bool, Option<String>) {
    match dev {
        None => (false, proxy),
        Some("true") => (true, proxy),
        Some("false") => (false, proxy),
        Some(value) => (true, Some(value.to_string())),
    }
}
