//! Directional stylesheet toggling for the RTL compilation window.
//!
//! The shared directional stylesheet declares a layout-direction default
//! (`ltr !default`). RTL compilation is only valid while that default is
//! flipped to `rtl !default`, so the flip is modeled as a scoped resource:
//! [`DirectionalWindow::acquire`] backs the file up and flips it,
//! [`DirectionalWindow::release`] flips it back and deletes the backup.
//! The drop guard restores on unwind paths so a failed RTL pass does not
//! leave the file flipped.
//!
//! Backup/restore failures are fatal: an unrestored directional
//! stylesheet would silently flip the layout direction of every future
//! build. A crash between acquire and release leaves the `.temp` backup
//! on disk for manual recovery.

use crate::{config::Config, log, sources};
use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

pub const LTR_MARKER: &str = "ltr !default";
pub const RTL_MARKER: &str = "rtl !default";
const BACKUP_SUFFIX: &str = ".temp";

pub struct DirectionalWindow {
    path: PathBuf,
    backup: PathBuf,
    /// Every theme source discovered at acquisition time, standard themes
    /// first. Re-enumerated here rather than reusing the compilers' own
    /// resolution so the window sees the filesystem as-is.
    pub all_themes: Vec<PathBuf>,
    released: bool,
}

impl DirectionalWindow {
    /// Back up the directional stylesheet and flip its direction default
    /// to rtl. Fails (fatally, for callers that propagate) if the backup
    /// cannot be created: without a backup a teardown cannot be verified
    /// safe.
    pub fn acquire(config: &Config) -> Result<Self> {
        let mut all_themes = sources::enumerate(&config.src.style_standard);
        all_themes.extend(sources::enumerate(&config.src.style_color));

        let path = config.src.directional.clone();
        let backup = PathBuf::from(format!("{}{BACKUP_SUFFIX}", path.display()));

        fs::copy(&path, &backup)
            .with_context(|| format!("failed to back up {}", path.display()))?;

        let content = fs::read_to_string(&path)?;
        fs::write(&path, content.replace(LTR_MARKER, RTL_MARKER))
            .with_context(|| format!("failed to flip {}", path.display()))?;

        Ok(Self {
            path,
            backup,
            all_themes,
            released: false,
        })
    }

    /// Flip the direction default back to ltr and delete the backup.
    /// Must run exactly once, after all RTL compilation finished (even
    /// with per-file errors). A failure here is unrecoverable without
    /// operator intervention, so it propagates as fatal.
    pub fn release(mut self) -> Result<()> {
        self.released = true;

        let content = fs::read_to_string(&self.path)?;
        fs::write(&self.path, content.replace(RTL_MARKER, LTR_MARKER))
            .with_context(|| format!("failed to restore {}", self.path.display()))?;

        fs::remove_file(&self.backup)
            .with_context(|| format!("failed to delete backup {}", self.backup.display()))?;
        Ok(())
    }
}

impl Drop for DirectionalWindow {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        // Unwind path: best-effort restore so the original failure stays
        // the primary error. The backup is left behind if anything here
        // fails, matching the crash-recovery contract.
        let restored = fs::read_to_string(&self.path)
            .and_then(|c| fs::write(&self.path, c.replace(RTL_MARKER, LTR_MARKER)))
            .and_then(|()| fs::remove_file(&self.backup));

        if let Err(e) = restored {
            log!("error"; "directional stylesheet left flipped, restore from {} manually: {e}",
                 self.backup.display());
        }
    }
}
