//! Conflict Analyzer (C6, `SPEC_FULL.md` §4.5).
//!
//! Pure functions: classify an overlap and suggest a resolution. The
//! analyzer never mutates registry state; it only inspects what the caller
//! hands it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::registry::Reservation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    ExclusiveExclusive,
    ExclusiveShared,
    SharedShared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Wait,
    ForceRelease,
    Negotiate,
    ChangePattern,
}

/// Classify the overlap between a requested reservation and one existing
/// holder, per `SPEC_FULL.md` §4.5's three-way table.
pub fn classify(requested_exclusive: bool, holder_exclusive: bool) -> ConflictKind {
    match (requested_exclusive, holder_exclusive) {
        (true, true) => ConflictKind::ExclusiveExclusive,
        (false, false) => ConflictKind::SharedShared,
        _ => ConflictKind::ExclusiveShared,
    }
}

/// Advisory resolution for a requested exclusive pattern blocked by the
/// given holders, evaluated at `now`. `pattern_is_narrowable` tells the
/// analyzer whether the caller could avoid the overlap by requesting a more
/// specific pattern (e.g. a single file instead of a directory glob).
pub fn suggest(
    blocking: &[Reservation],
    now: DateTime<Utc>,
    pattern_is_narrowable: bool,
) -> Resolution {
    if blocking.iter().any(|r| r.expires_at <= now) {
        return Resolution::ForceRelease;
    }
    let near_horizon = now + Duration::minutes(5);
    if blocking.iter().all(|r| r.expires_at <= near_horizon) {
        return Resolution::Wait;
    }
    if pattern_is_narrowable {
        return Resolution::ChangePattern;
    }
    Resolution::Negotiate
}

/// Lexical overlap between two glob patterns: do their expansions share at
/// least one path? No filesystem access; `**` matches any number of path
/// segments (including zero), `*` matches exactly one segment.
pub fn patterns_overlap(a: &str, b: &str) -> bool {
    let a_segments: Vec<&str> = a.split('/').collect();
    let b_segments: Vec<&str> = b.split('/').collect();
    overlap_segments(&a_segments, &b_segments)
}

fn overlap_segments(a: &[&str], b: &[&str]) -> bool {
    match (a.first(), b.first()) {
        (None, None) => true,
        (None, Some(_)) => b.iter().all(|s| *s == "**"),
        (Some(_), None) => a.iter().all(|s| *s == "**"),
        (Some(&a0), Some(&b0)) => {
            if a0 == "**" {
                overlap_segments(&a[1..], b) || overlap_segments(a, &b[1..])
            } else if b0 == "**" {
                overlap_segments(a, &b[1..]) || overlap_segments(&a[1..], b)
            } else if a0 == "*" || b0 == "*" || a0 == b0 {
                overlap_segments(&a[1..], &b[1..])
            } else {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_patterns_overlap() {
        assert!(patterns_overlap(
            "internal/auth/*.go",
            "internal/auth/*.go"
        ));
    }

    #[test]
    fn disjoint_directories_do_not_overlap() {
        assert!(!patterns_overlap("internal/auth/*.go", "internal/cache/*.go"));
    }

    #[test]
    fn double_star_matches_nested_paths() {
        assert!(patterns_overlap("internal/**", "internal/auth/token.go"));
        assert!(patterns_overlap("internal/**", "internal"));
    }

    #[test]
    fn classify_matches_spec_table() {
        assert_eq!(classify(true, true), ConflictKind::ExclusiveExclusive);
        assert_eq!(classify(true, false), ConflictKind::ExclusiveShared);
        assert_eq!(classify(false, true), ConflictKind::ExclusiveShared);
        assert_eq!(classify(false, false), ConflictKind::SharedShared);
    }
}
