//! Theme source enumeration.
//!
//! Glob patterns are the single source of truth: every call re-resolves
//! against the filesystem so changes between pipeline stages are picked up.
//! Nothing here caches.

use crate::config::Config;
use glob::glob;
use std::path::PathBuf;

/// The two stylesheet source groups.
///
/// They differ in nesting depth, which matters for the RTL override
/// import: the injected path is relative to the source's own location
/// and the two depths are not interchangeable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeGroup {
    Standard,
    Color,
}

impl ThemeGroup {
    pub fn pattern(self, config: &Config) -> &str {
        match self {
            Self::Standard => &config.src.style_standard,
            Self::Color => &config.src.style_color,
        }
    }

    /// RTL override import injected ahead of the source before parsing.
    pub const fn rtl_import(self) -> &'static str {
        match self {
            Self::Standard => "@import \"./rtl.scss\";\n",
            Self::Color => "@import \"../rtl.scss\";\n",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Color => "color",
        }
    }
}

/// Expand a glob pattern into the ordered set of matching files.
///
/// Zero matches is not an error; an invalid pattern yields the empty set.
pub fn enumerate(pattern: &str) -> Vec<PathBuf> {
    let Ok(paths) = glob(pattern) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = paths
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_enumerate_matches_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("style_green.scss"), "").unwrap();
        fs::write(dir.path().join("style_blue.scss"), "").unwrap();
        fs::write(dir.path().join("other.scss"), "").unwrap();

        let pattern = format!("{}/style_*.scss", dir.path().display());
        let files = enumerate(&pattern);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["style_blue.scss", "style_green.scss"]);
    }

    #[test]
    fn test_enumerate_empty_on_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/style_*.scss", dir.path().display());
        assert!(enumerate(&pattern).is_empty());
    }

    #[test]
    fn test_enumerate_resolves_fresh_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/style_*.scss", dir.path().display());
        assert!(enumerate(&pattern).is_empty());

        fs::write(dir.path().join("style_new.scss"), "").unwrap();
        assert_eq!(enumerate(&pattern).len(), 1);
    }

    #[test]
    fn test_rtl_import_depths_differ() {
        assert_ne!(
            ThemeGroup::Standard.rtl_import(),
            ThemeGroup::Color.rtl_import()
        );
        assert!(ThemeGroup::Standard.rtl_import().contains("\"./rtl.scss\""));
        assert!(ThemeGroup::Color.rtl_import().contains("\"../rtl.scss\""));
    }
}
