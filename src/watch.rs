//! Polling watcher for theme sources and prebuilt theme files.
//!
//! Two concerns share the loop:
//!
//! - `.scss` changes anywhere under the interface tree re-trigger the
//!   style compiler (both groups, parallel).
//! - `.css`/`.php` files colocated with the theme sources are mirrored
//!   into the output directory verbatim (initial copy at startup, then
//!   on change).
//!
//! Polling with a fixed interval, not push-based events: the source
//! trees this pipeline targets sit on mounts where inotify-style events
//! are unreliable. A transient error for one file never terminates the
//! loop; watcher setup errors are fatal.

use crate::{
    compiler::{self, Mode},
    config::Config,
    log,
    reload::ReloadHub,
    serve,
    sources::ThemeGroup,
};
use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::mpsc,
    time::Duration,
};

/// Fixed poll interval for source changes.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, PartialEq, Eq)]
enum WatchAction {
    /// A stylesheet source changed: recompile both theme groups.
    Recompile,
    /// A prebuilt theme file changed: mirror it into the output.
    Mirror,
    Ignore,
}

fn classify(path: &Path, mirror_dir: Option<&Path>) -> WatchAction {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        "scss" => WatchAction::Recompile,
        "css" | "php"
            if path
                .parent()
                .and_then(|p| p.canonicalize().ok())
                .as_deref()
                == mirror_dir =>
        {
            WatchAction::Mirror
        }
        _ => WatchAction::Ignore,
    }
}

const fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

/// Start the blocking watch loop.
pub fn watch_blocking(config: &'static Config, hub: Option<ReloadHub>) -> Result<()> {
    // Initial mirror pass, matching the non-incremental copy on startup.
    let copied = serve::copy_prebuilt_themes(config)?;
    if copied > 0 {
        log!("watch"; "mirrored {copied} prebuilt theme files");
    }

    let interface_dir = config.root.join("interface");
    let (tx, rx) = mpsc::channel();
    let mut watcher = PollWatcher::new(
        tx,
        NotifyConfig::default().with_poll_interval(POLL_INTERVAL),
    )
    .context("failed to create poll watcher")?;
    watcher
        .watch(&interface_dir, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", interface_dir.display()))?;

    log!("watch"; "{}", interface_dir.display());

    let mirror_dir = config.themes_dir.canonicalize().ok();
    loop {
        match rx.recv() {
            Ok(Ok(event)) if is_relevant(&event) => {
                handle_event(&event.paths, mirror_dir.as_deref(), config, hub.as_ref());
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(_) => break,
        }
    }

    Ok(())
}

/// React to one batch of changed paths. Errors are logged per file; the
/// loop keeps running regardless.
fn handle_event(
    paths: &[PathBuf],
    mirror_dir: Option<&Path>,
    config: &Config,
    hub: Option<&ReloadHub>,
) {
    let mut recompile = false;

    for path in paths {
        match classify(path, mirror_dir) {
            WatchAction::Recompile => recompile = true,
            WatchAction::Mirror => {
                if let Err(e) = mirror_file(path, config) {
                    log!("watch"; "{}: {e:#}", path.display());
                }
            }
            WatchAction::Ignore => {}
        }
    }

    // Each trigger recompiles both groups; overlapping triggers for the
    // same file settle as last-write-wins.
    if recompile {
        let mode = Mode {
            dev: config.dev,
            rtl: false,
        };
        let (standard, color) = rayon::join(
            || compiler::compile_group(ThemeGroup::Standard, mode, config, hub),
            || compiler::compile_group(ThemeGroup::Color, mode, config, hub),
        );
        log!("watch"; "recompiled {} stylesheets", standard + color);
    }
}

fn mirror_file(path: &Path, config: &Config) -> Result<()> {
    if !path.is_file() {
        return Ok(());
    }
    let name = path
        .file_name()
        .context("path without file name")?;
    fs::create_dir_all(&config.themes_out)?;
    fs::copy(path, config.themes_out.join(name))?;
    log!("watch"; "mirrored {}", name.to_string_lossy());
    Ok(())
}
