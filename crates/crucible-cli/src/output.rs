//! Terminal output helpers: TTY-aware coloring, one function per message kind. Uses `console`.
//!
//! `--json` swaps result output for a single structured line on stdout (diagnostics stay on
//! stderr via [`warning`]/[`error`] regardless of the flag); see [`emit_json`].

use console::style;
use serde::Serialize;

/// Serializes `value` as one compact JSON line to stdout. Used by command result output when
/// `--json` is set, in place of the human-readable [`success`]/[`info`] calls.
pub fn emit_json<T: Serialize>(value: &T) {
    match sonic_rs::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => error(&format!("failed to serialize JSON output: {e}")),
    }
}

pub fn header(text: &str) {
    println!("{} {}", style("crucible").cyan().bold(), text);
}

pub fn success(text: &str) {
    println!("{} {}", style("✓").green().bold(), text);
}

pub fn warning(text: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), style(text).yellow());
}

pub fn error(text: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(text).red());
}

pub fn info(text: &str) {
    println!("{} {}", style("i").blue().bold(), text);
}

pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_picks_a_unit() {
        assert!(format_duration(std::time::Duration::from_millis(50)).ends_with("ms"));
        assert!(format_duration(std::time::Duration::from_secs(5)).ends_with('s'));
        assert!(format_duration(std::time::Duration::from_secs(90)).ends_with('m'));
    }
}
