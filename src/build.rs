//! Default pipeline orchestration.
//!
//! ```text
//! clean ──► compile themes ──► sync ──► acquire window ──► compile RTL ──► release
//!            (standard ∥ color)                             (standard ∥ color)
//! ```
//!
//! The RTL compilers only produce correct output while the directional
//! window is open, so the window brackets them strictly; no locking is
//! involved because exactly one pipeline instance runs per source tree.

use crate::{
    compiler::{self, Mode},
    config::Config,
    direction::DirectionalWindow,
    log,
    serve::{self, SyncSession},
    sources::ThemeGroup,
};
use anyhow::{Context, Result};
use std::fs;

/// Run the full clean-build-sync-RTL flow. Blocks on the dev session
/// afterwards when one was opened.
pub fn run_pipeline(config: &'static Config) -> Result<()> {
    clean(config)?;

    let mode = Mode {
        dev: config.dev,
        rtl: false,
    };
    // No reload hub yet: the session opens in the sync step below, so
    // the initial compile has nobody to notify.
    let (standard, color) = rayon::join(
        || compiler::compile_group(ThemeGroup::Standard, mode, config, None),
        || compiler::compile_group(ThemeGroup::Color, mode, config, None),
    );
    log!("compile"; "{} stylesheets written", standard + color);

    let session = serve::sync(config)?;
    let hub = session.as_ref().map(SyncSession::hub);

    let window = DirectionalWindow::acquire(config)?;
    log!("rtl"; "compiling {} themes right-to-left", window.all_themes.len());

    let rtl_mode = Mode {
        dev: config.dev,
        rtl: true,
    };
    let (standard, color) = rayon::join(
        || compiler::compile_group(ThemeGroup::Standard, rtl_mode, config, hub.as_ref()),
        || compiler::compile_group(ThemeGroup::Color, rtl_mode, config, hub.as_ref()),
    );
    log!("rtl"; "{} stylesheets written", standard + color);

    // Teardown runs even when individual files failed above; only a
    // restore failure may stop the pipeline here.
    window.release()?;

    if let Some(session) = session {
        log!("serve"; "pipeline complete, session running (Ctrl+C to stop)");
        session.wait();
    }
    Ok(())
}

/// Clear lingering compiled themes from a previous run.
fn clean(config: &Config) -> Result<()> {
    let out = &config.themes_out;
    if out.exists() {
        fs::remove_dir_all(out)
            .with_context(|| format!("failed to clear {}", out.display()))?;
    }
    fs::create_dir_all(out)?;
    log!("clean"; "{}", out.display());
    Ok(())
}
