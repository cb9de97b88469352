//! Unified-diff apply routine: covers standard unified-diff hunks (add/remove/
//! context lines) with offset-tolerant hunk location.

use crucible_core::{Error, Result};

struct Hunk {
    old_start: usize,
    lines: Vec<HunkLine>,
}

enum HunkLine {
    Context(String),
    Remove(String),
    Add(String),
}

/// Applies a unified-diff `patch` to `original`, returning the patched content.
///
/// # Errors
/// Returns [`crucible_core::Error::install`] if a hunk's header can't be parsed, or if its
/// context/removed lines can't be located in `original` within a reasonable offset window.
pub fn apply(original: &str, patch: &str) -> Result<String> {
    let hunks = parse_hunks(patch)?;
    let original_lines: Vec<&str> = original.lines().collect();

    let mut out = Vec::new();
    let mut cursor = 0usize;

    for hunk in &hunks {
        let expected = hunk.old_start.saturating_sub(1);
        let needle: Vec<&str> = hunk
            .lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Remove(s) => Some(s.as_str()),
                HunkLine::Add(_) => None,
            })
            .collect();

        let match_start = locate(&original_lines, &needle, expected, cursor)
            .ok_or_else(|| Error::install("patch does not apply: hunk context not found"))?;

        out.extend_from_slice(&original_lines[cursor..match_start]);

        let mut orig_idx = match_start;
        for line in &hunk.lines {
            match line {
                HunkLine::Context(_) => {
                    out.push(original_lines[orig_idx]);
                    orig_idx += 1;
                }
                HunkLine::Remove(_) => {
                    orig_idx += 1;
                }
                HunkLine::Add(text) => {
                    out.push(text.as_str());
                }
            }
        }
        cursor = orig_idx;
    }

    out.extend_from_slice(&original_lines[cursor..]);

    let mut result = out.join("\n");
    if original.ends_with('\n') {
        result.push('\n');
    }
    Ok(result)
}

/// Finds where `needle` (the hunk's context+removed lines) occurs in `haystack`, preferring
/// `expected` but searching outward within a bounded window to tolerate line-number drift from
/// earlier hunks.
fn locate(haystack: &[&str], needle: &[&str], expected: usize, min_start: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(expected.max(min_start));
    }

    let window = 1000usize;
    let lo = expected.saturating_sub(window).max(min_start);
    let hi = (expected + window).min(haystack.len());

    let mut offsets: Vec<usize> = (lo..=hi).collect();
    offsets.sort_by_key(|&s| s.abs_diff(expected));

    for start in offsets {
        if start + needle.len() > haystack.len() {
            continue;
        }
        if haystack[start..start + needle.len()] == *needle {
            return Some(start);
        }
    }
    None
}

fn parse_hunks(patch: &str) -> Result<Vec<Hunk>> {
    let mut hunks = Vec::new();
    let mut lines = patch.lines().peekable();

    while let Some(line) = lines.next() {
        if !line.starts_with("@@") {
            continue;
        }
        let old_start = parse_hunk_header(line)?;
        let mut hunk_lines = Vec::new();

        while let Some(&next) = lines.peek() {
            if next.starts_with("@@") {
                break;
            }
            let content = lines.next().unwrap();
            if let Some(rest) = content.strip_prefix(' ') {
                hunk_lines.push(HunkLine::Context(rest.to_string()));
            } else if let Some(rest) = content.strip_prefix('-') {
                if content.starts_with("---") {
                    continue;
                }
                hunk_lines.push(HunkLine::Remove(rest.to_string()));
            } else if let Some(rest) = content.strip_prefix('+') {
                if content.starts_with("+++") {
                    continue;
                }
                hunk_lines.push(HunkLine::Add(rest.to_string()));
            } else if content.is_empty() {
                hunk_lines.push(HunkLine::Context(String::new()));
            }
        }

        hunks.push(Hunk { old_start, lines: hunk_lines });
    }

    if hunks.is_empty() {
        return Err(Error::install("patch contains no hunks"));
    }

    Ok(hunks)
}

/// Parses `@@ -old_start,old_count +new_start,new_count @@` for the old-file start line.
fn parse_hunk_header(line: &str) -> Result<usize> {
    let bad = || Error::install(format!("malformed hunk header: {line}"));

    let rest = line.strip_prefix("@@ ").ok_or_else(bad)?;
    let old_part = rest.split(' ').next().ok_or_else(bad)?;
    let old_part = old_part.strip_prefix('-').ok_or_else(bad)?;
    let start_str = old_part.split(',').next().ok_or_else(bad)?;
    start_str.parse::<usize>().map_err(|_| bad())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_a_simple_context_hunk() {
        let original = "line1\nline2\nline3\n";
        let patch = "--- a/file\n+++ b/file\n@@ -1,3 +1,3 @@\n line1\n-line2\n+line2-patched\n line3\n";
        let patched = apply(original, patch).unwrap();
        assert_eq!(patched, "line1\nline2-patched\nline3\n");
    }

    #[test]
    fn applies_an_addition_only_hunk() {
        let original = "a\nb\n";
        let patch = "@@ -1,2 +1,3 @@\n a\n+inserted\n b\n";
        let patched = apply(original, patch).unwrap();
        assert_eq!(patched, "a\ninserted\nb\n");
    }

    #[test]
    fn tolerates_line_number_drift() {
        let original = "x\ny\nz\ntarget\nw\n";
        // Header claims target is at line 1, but it's actually at line 4 -- offset tolerance.
        let patch = "@@ -1,1 +1,1 @@\n-target\n+replaced\n";
        let patched = apply(original, patch).unwrap();
        assert!(patched.contains("replaced"));
        assert!(!patched.contains("target"));
    }

    #[test]
    fn missing_context_is_an_install_error() {
        let original = "a\nb\n";
        let patch = "@@ -1,1 +1,1 @@\n-nonexistent\n+y\n";
        let err = apply(original, patch).unwrap_err();
        assert_eq!(err.code(), crucible_core::ErrorCode::Install);
    }
}
