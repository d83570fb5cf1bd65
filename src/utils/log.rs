//! Colored terminal logging.
//!
//! Provides the `log!` macro for one-line messages with a colored
//! `[module]` prefix.

use colored::{ColoredString, Colorize};
use std::io::{Write, stdout};

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("compile"; "{} stylesheets written", count);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::utils::log::log($module, &format!($($arg)*))
    }};
}

#[inline]
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let mut out = stdout().lock();
    writeln!(out, "{prefix} {message}").ok();
    out.flush().ok();
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module {
        "serve" => prefix.bright_blue().bold(),
        "watch" | "clean" => prefix.bright_green().bold(),
        "error" => prefix.bright_red().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorize_prefix_wraps_in_brackets() {
        for module in ["compile", "rtl", "install", "serve", "watch", "error"] {
            let prefix = colorize_prefix(module);
            let plain = format!("{prefix}");
            assert!(plain.contains(&format!("[{module}]")));
        }
    }

    #[test]
    fn test_log_does_not_panic() {
        log("compile", "message");
        log("", "");
    }
}
