//! Spack-style version ordering.
//!
//! Unlike semver, these versions are arbitrary dot/dash/underscore-separated sequences of
//! numeric and alphabetic segments (`3.10.2`, `2021.09`, `1.2.3rc1`, `develop`). Comparison is
//! segment-wise: numeric segments compare numerically, alphabetic segments compare
//! lexicographically, and a numeric segment always sorts after an alphabetic one at the same
//! position (so `1.2` > `1.2rc1`, matching the common "a pre-release token sorts before the
//! final numeric release" convention).

use std::cmp::Ordering;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static SEGMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+|[A-Za-z]+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Version(String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Numeric(u64),
    Alpha(String),
}

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> Vec<Segment> {
        SEGMENT_RE
            .find_iter(&self.0)
            .map(|m| {
                let text = m.as_str();
                if text.bytes().next().is_some_and(|b| b.is_ascii_digit()) {
                    Segment::Numeric(text.parse().unwrap_or(0))
                } else {
                    Segment::Alpha(text.to_lowercase())
                }
            })
            .collect()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

fn segment_cmp(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(x), Segment::Numeric(y)) => x.cmp(y),
        (Segment::Alpha(x), Segment::Alpha(y)) => x.cmp(y),
        // a numeric segment sorts after an alphabetic one at the same position: 1.2 > 1.2rc1
        (Segment::Numeric(_), Segment::Alpha(_)) => Ordering::Greater,
        (Segment::Alpha(_), Segment::Numeric(_)) => Ordering::Less,
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut a = self.segments();
        let mut b = other.segments();
        let len = a.len().max(b.len());
        a.resize(len, Segment::Numeric(0));
        b.resize(len, Segment::Numeric(0));
        for (x, y) in a.iter().zip(b.iter()) {
            match segment_cmp(x, y) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_segments_compare_numerically_not_lexically() {
        assert!(Version::new("1.9.0") < Version::new("1.10.0"));
    }

    #[test]
    fn pre_release_token_sorts_before_final() {
        assert!(Version::new("1.2rc1") < Version::new("1.2"));
    }

    #[test]
    fn equal_versions_compare_equal() {
        assert_eq!(Version::new("2021.09"), Version::new("2021.09"));
    }

    #[test]
    fn develop_sorts_as_alpha_segment() {
        assert!(Version::new("develop") != Version::new("1.0"));
    }

    #[test]
    fn display_round_trips_raw_string() {
        assert_eq!(Version::new("3.10.2").to_string(), "3.10.2");
    }
}
