//! Stylesheet compilation pipeline.
//!
//! Every theme source runs through a fixed, ordered list of named stages,
//! each taking and returning an in-memory [`Document`]:
//!
//! ```text
//! parse ──► prefix ──► header ──► minify ──► sourcemap ──► rename
//!   │          │          │          │            │           │
//!  SCSS     vendor    attribution  (prod      (prod only)  (rtl only)
//!  → CSS    prefixes   comment      only)
//! ```
//!
//! The write step and the dev-session notification happen after the last
//! stage, in [`compile_file`]. A stage failure aborts only that file's
//! compilation; sibling files in the same group are unaffected.

use crate::{
    config::Config,
    log,
    reload::ReloadHub,
    sources::{self, ThemeGroup},
};
use anyhow::{Context, Result, anyhow};
use lightningcss::{
    stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet},
    targets::{Browsers, Targets},
};
use parcel_sourcemap::SourceMap;
use rayon::prelude::*;
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

/// Attribution header prepended to every compiled stylesheet.
/// Byte-identical across all outputs; tooling downstream greps for it.
pub const HEADER: &str = "/*! This style sheet was autogenerated by themebuild.\n *  For usage instructions, see interface/README.md in the application repository.\n */\n";

/// Pinned minimum browser-support target for vendor prefixing.
const BROWSER_TARGETS: &[&str] = &["last 1 version"];

// ============================================================================
// Pipeline Types
// ============================================================================

/// Compilation mode for one pipeline run.
#[derive(Clone, Copy, Debug)]
pub struct Mode {
    pub dev: bool,
    pub rtl: bool,
}

/// In-memory compilation state threaded through the stages.
pub struct Document {
    /// Stylesheet text after the most recent stage.
    pub css: String,
    /// Source file the document was loaded from.
    pub source: PathBuf,
    /// Output basename, initially `<stem>.css`; the rename stage
    /// prefixes it with `rtl_` in RTL mode.
    pub out_name: String,
    /// Source map JSON produced by the sourcemap stage.
    pub map: Option<String>,
}

/// Shared context available to every stage.
pub struct Ctx<'a> {
    pub config: &'a Config,
    pub group: ThemeGroup,
    pub mode: Mode,
}

type Stage = fn(Document, &Ctx) -> Result<Document>;

/// The fixed stage order. Later stages depend on earlier output, so this
/// list is not reorderable: prefixing works on plain CSS, minification
/// must see the header to preserve it, and the rename happens after all
/// content transforms so every stage sees the source-derived name.
const STAGES: &[(&str, Stage)] = &[
    ("parse", parse_scss),
    ("prefix", vendor_prefix),
    ("header", prepend_header),
    ("minify", minify),
    ("sourcemap", attach_source_map),
    ("rename", rename_rtl),
];

// ============================================================================
// Stages
// ============================================================================

/// Transpile SCSS into plain CSS. The source's own directory is the load
/// path so relative `@import`s (including the injected RTL override)
/// resolve correctly.
fn parse_scss(mut doc: Document, _ctx: &Ctx) -> Result<Document> {
    let dir = doc.source.parent().unwrap_or(Path::new("."));
    let options = grass::Options::default()
        .style(grass::OutputStyle::Expanded)
        .load_path(dir);

    doc.css = grass::from_string(std::mem::take(&mut doc.css), &options)
        .map_err(|e| anyhow!("scss: {e}"))?;
    Ok(doc)
}

/// Apply vendor prefixes for the pinned browser-support target.
fn vendor_prefix(mut doc: Document, _ctx: &Ctx) -> Result<Document> {
    let targets = browser_targets();
    let code = {
        let mut sheet = StyleSheet::parse(&doc.css, ParserOptions::default())
            .map_err(|e| anyhow!("css parse: {e}"))?;
        sheet
            .minify(MinifyOptions {
                targets: targets.clone(),
                ..MinifyOptions::default()
            })
            .map_err(|e| anyhow!("prefix: {e}"))?;
        sheet
            .to_css(PrinterOptions {
                targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| anyhow!("prefix: {e}"))?
            .code
    };
    doc.css = code;
    Ok(doc)
}

fn prepend_header(mut doc: Document, _ctx: &Ctx) -> Result<Document> {
    doc.css = format!("{HEADER}{}", doc.css);
    Ok(doc)
}

/// Minify the stylesheet (production only). The attribution header is
/// split off and re-attached because the minifier strips comments.
/// Also collects source map mappings for the following stage.
fn minify(mut doc: Document, ctx: &Ctx) -> Result<Document> {
    if ctx.mode.dev {
        return Ok(doc);
    }

    let body = doc.css.strip_prefix(HEADER).unwrap_or(&doc.css);
    let mut map = SourceMap::new("/");

    let code = {
        let mut sheet = StyleSheet::parse(body, ParserOptions::default())
            .map_err(|e| anyhow!("css parse: {e}"))?;
        sheet
            .minify(MinifyOptions::default())
            .map_err(|e| anyhow!("minify: {e}"))?;
        sheet
            .to_css(PrinterOptions {
                minify: true,
                source_map: Some(&mut map),
                ..PrinterOptions::default()
            })
            .map_err(|e| anyhow!("minify: {e}"))?
            .code
    };

    doc.css = format!("{HEADER}{code}");
    doc.map = Some(map.to_json(None).map_err(|e| anyhow!("sourcemap: {e}"))?);
    Ok(doc)
}

/// Reference the source map written next to the output (production only).
/// Uses the post-rename basename so RTL outputs point at their own map.
fn attach_source_map(mut doc: Document, ctx: &Ctx) -> Result<Document> {
    if ctx.mode.dev || doc.map.is_none() {
        return Ok(doc);
    }
    let final_name = if ctx.mode.rtl {
        format!("rtl_{}", doc.out_name)
    } else {
        doc.out_name.clone()
    };
    doc.css
        .push_str(&format!("\n/*# sourceMappingURL={final_name}.map */\n"));
    Ok(doc)
}

/// Prefix the output basename in RTL mode.
fn rename_rtl(mut doc: Document, ctx: &Ctx) -> Result<Document> {
    if ctx.mode.rtl {
        doc.out_name = format!("rtl_{}", doc.out_name);
    }
    Ok(doc)
}

fn browser_targets() -> Targets {
    let browsers = Browsers::from_browserslist(BROWSER_TARGETS.iter().copied())
        .ok()
        .flatten();
    Targets {
        browsers,
        ..Targets::default()
    }
}

// ============================================================================
// Compilation Entry Points
// ============================================================================

fn load_document(path: &Path, group: ThemeGroup, mode: Mode) -> Result<Document> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    // The RTL override import goes ahead of everything else so its rules
    // can be overridden by the theme itself.
    let css = if mode.rtl {
        format!("{}{raw}", group.rtl_import())
    } else {
        raw
    };

    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .ok_or_else(|| anyhow!("invalid source name: {}", path.display()))?;

    Ok(Document {
        css,
        source: path.to_path_buf(),
        out_name: format!("{stem}.css"),
        map: None,
    })
}

/// Compile one theme source through the full stage pipeline and write the
/// result. Returns the output path.
pub fn compile_file(
    path: &Path,
    group: ThemeGroup,
    mode: Mode,
    config: &Config,
    hub: Option<&ReloadHub>,
) -> Result<PathBuf> {
    let mut doc = load_document(path, group, mode)?;
    let ctx = Ctx { config, group, mode };

    for (name, stage) in STAGES {
        doc = stage(doc, &ctx)
            .with_context(|| format!("{name} stage failed for {}", path.display()))?;
    }

    fs::create_dir_all(&config.themes_out)?;
    let dest = config.themes_out.join(&doc.out_name);
    fs::write(&dest, &doc.css)
        .with_context(|| format!("failed to write {}", dest.display()))?;

    if let Some(map) = &doc.map {
        fs::write(config.themes_out.join(format!("{}.map", doc.out_name)), map)?;
    }

    // Dual-write hook: today the dev/build destination is the same file,
    // kept as an explicit second write for future divergent targets.
    if mode.dev && config.build {
        fs::write(&dest, &doc.css)?;
    }

    if mode.dev
        && let Some(hub) = hub
    {
        hub.notify_css(&doc.out_name);
    }

    Ok(dest)
}

/// Compile every source matching a group's pattern, fanning out across
/// files. A failure in one file is logged and skipped; the rest of the
/// group still compiles. Returns the number of stylesheets written.
pub fn compile_group(
    group: ThemeGroup,
    mode: Mode,
    config: &Config,
    hub: Option<&ReloadHub>,
) -> usize {
    let files = sources::enumerate(group.pattern(config));

    files
        .par_iter()
        .map(|path| match compile_file(path, group, mode, config, hub) {
            Ok(_) => 1,
            Err(e) => {
                log!("error"; "{} ({}): {e:#}", path.display(), group.name());
                0
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use std::path::PathBuf;

    fn test_config(root: &Path) -> Config {
        let cli = Cli {
            root: root.to_path_buf(),
            dev: None,
            build: false,
            sync_only: false,
            proxy: None,
            install: false,
            manifest: PathBuf::from("package.json"),
            command: None,
        };
        Config::from_cli(&cli).unwrap()
    }

    fn write_theme(dir: &Path, name: &str, scss: &str) -> PathBuf {
        let themes = dir.join("interface/themes");
        fs::create_dir_all(&themes).unwrap();
        let path = themes.join(name);
        fs::write(&path, scss).unwrap();
        path
    }

    const PROD: Mode = Mode {
        dev: false,
        rtl: false,
    };
    const DEV: Mode = Mode {
        dev: true,
        rtl: false,
    };

    #[test]
    fn test_production_output_starts_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let src = write_theme(dir.path(), "style_blue.scss", "body { .x { color: red; } }");

        let out = compile_file(&src, ThemeGroup::Standard, PROD, &config, None).unwrap();
        let css = fs::read_to_string(&out).unwrap();
        assert!(css.starts_with(HEADER));
        // Nesting resolved by the parse stage
        assert!(css.contains("body .x"));
    }

    #[test]
    fn test_production_minifies_and_writes_map() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let src = write_theme(
            dir.path(),
            "style_blue.scss",
            "body {\n  color: red;\n  background: blue;\n}\n",
        );

        compile_file(&src, ThemeGroup::Standard, PROD, &config, None).unwrap();
        let css = fs::read_to_string(config.themes_out.join("style_blue.css")).unwrap();

        let body = css.strip_prefix(HEADER).unwrap();
        // Minified body keeps declarations on one line
        assert!(body.lines().next().unwrap().contains("color:red"));
        assert!(css.contains("sourceMappingURL=style_blue.css.map"));
        assert!(config.themes_out.join("style_blue.css.map").exists());
    }

    #[test]
    fn test_dev_output_unminified_without_map() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let src = write_theme(
            dir.path(),
            "style_blue.scss",
            "body {\n  color: red;\n  background: blue;\n}\n",
        );

        compile_file(&src, ThemeGroup::Standard, DEV, &config, None).unwrap();
        let css = fs::read_to_string(config.themes_out.join("style_blue.css")).unwrap();

        assert!(css.starts_with(HEADER));
        assert!(!css.contains("sourceMappingURL"));
        assert!(!config.themes_out.join("style_blue.css.map").exists());
        // Expanded output keeps one declaration per line
        assert!(css.contains("color: red;"));
    }

    #[test]
    fn test_rtl_renames_and_injects_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_theme(dir.path(), "rtl.scss", "body { direction: rtl; }");
        let src = write_theme(dir.path(), "style_blue.scss", "p { color: red; }");

        let mode = Mode {
            dev: true,
            rtl: true,
        };
        let out = compile_file(&src, ThemeGroup::Standard, mode, &config, None).unwrap();

        assert_eq!(out.file_name().unwrap(), "rtl_style_blue.css");
        let css = fs::read_to_string(&out).unwrap();
        assert!(css.contains("direction: rtl"));
        assert!(css.contains("color: red"));
    }

    #[test]
    fn test_rtl_color_theme_uses_parent_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_theme(dir.path(), "rtl.scss", "body { direction: rtl; }");
        let colors = dir.path().join("interface/themes/colors");
        fs::create_dir_all(&colors).unwrap();
        let src = colors.join("ocean.scss");
        fs::write(&src, "p { color: teal; }").unwrap();

        let mode = Mode {
            dev: true,
            rtl: true,
        };
        let out = compile_file(&src, ThemeGroup::Color, mode, &config, None).unwrap();
        assert_eq!(out.file_name().unwrap(), "rtl_ocean.css");
        assert!(fs::read_to_string(&out).unwrap().contains("direction: rtl"));
    }

    #[test]
    fn test_syntax_error_fails_only_that_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_theme(dir.path(), "style_bad.scss", "body { color: ");
        write_theme(dir.path(), "style_good.scss", "p { color: red; }");

        let compiled = compile_group(ThemeGroup::Standard, PROD, &config, None);
        assert_eq!(compiled, 1);
        assert!(config.themes_out.join("style_good.css").exists());
        assert!(!config.themes_out.join("style_bad.css").exists());
    }

    #[test]
    fn test_compile_group_empty_pattern_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        assert_eq!(compile_group(ThemeGroup::Color, PROD, &config, None), 0);
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let names: Vec<_> = STAGES.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["parse", "prefix", "header", "minify", "sourcemap", "rename"]
        );
    }
}
