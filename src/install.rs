//! Third-party asset vendoring.
//!
//! Reads the package descriptor, merges its two dependency sections and
//! copies each installed package's relevant subset into the public assets
//! tree, namespaced by package name. Per-package failures are logged and
//! isolated; the remaining packages still install.

use crate::{config::Config, log, utils::fsx};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};

/// Packages with known non-standard layouts, mapped to the subdirectories
/// worth vendoring. Everything else follows the default rule: the `dist`
/// subdirectory if one exists, the whole package tree otherwise.
const PACKAGE_LAYOUTS: &[(&str, &[&str])] = &[
    ("dwv", &["dist", "decoders", "locales"]),
    ("bootstrap", &["dist", "scss"]),
    ("bootstrap-v4-rtl", &["dist", "scss"]),
];

/// The two dependency sections of the package descriptor.
#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Alternate-source dependencies. On a key collision these entries
    /// override `dependencies`.
    #[serde(default)]
    pub napa: BTreeMap<String, String>,
}

impl Manifest {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid manifest {}", path.display()))
    }

    /// Merge both sections into one mapping keyed by package name.
    pub fn merged(&self) -> BTreeMap<&str, &str> {
        let mut all: BTreeMap<&str, &str> = self
            .dependencies
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        for (k, v) in &self.napa {
            all.insert(k, v);
        }
        all
    }
}

/// Vendor every declared package into the public assets directory.
pub fn install_assets(config: &Config) -> Result<()> {
    let manifest = Manifest::from_path(&config.manifest)?;
    let packages = manifest.merged();
    log!("install"; "vendoring {} packages", packages.len());

    let mut failures = 0;
    for name in packages.keys() {
        if let Err(e) = install_package(name, config) {
            failures += 1;
            log!("error"; "{name}: {e:#}");
        }
    }

    if failures > 0 {
        log!("install"; "done, {failures} packages failed");
    } else {
        log!("install"; "done");
    }
    Ok(())
}

/// Resolve a package's layout and copy it under its assets namespace.
///
/// Precedence: the layout table first, then the dist-only rule, then a
/// full-tree copy.
fn install_package(name: &str, config: &Config) -> Result<()> {
    let pkg_root = config.modules_dir.join(name);
    if !pkg_root.is_dir() {
        bail!("not present under {}", config.modules_dir.display());
    }

    let dest_root = config.assets_out.join(name);

    if let Some((_, subdirs)) = PACKAGE_LAYOUTS.iter().find(|(n, _)| *n == name) {
        for sub in *subdirs {
            fsx::copy_tree(&pkg_root.join(sub), &dest_root.join(sub))?;
        }
    } else if pkg_root.join("dist").is_dir() {
        fsx::copy_tree(&pkg_root.join("dist"), &dest_root.join("dist"))?;
    } else {
        fsx::copy_tree(&pkg_root, &dest_root)?;
    }
    Ok(())
}
