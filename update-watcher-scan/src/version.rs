//! Lenient version comparison.
//!
//! Platform versions are not always semver: `6.4` means `6.4.0` and a
//! release may carry four numeric parts. Versions that can be normalised are
//! compared with [`semver`]; anything else falls back to a segment-wise
//! comparison where numeric segments compare numerically.

use semver::Version;
use std::cmp::Ordering;

/// Drop a `-suffix` (e.g. `6.5-beta1` → `6.5`).
pub fn strip_suffix(version: &str) -> &str {
    version.split('-').next().unwrap_or(version)
}

/// Parse `version` as semver after padding missing minor/patch parts.
pub fn normalize(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    let (core, rest) = match version.find(['-', '+']) {
        Some(idx) => version.split_at(idx),
        None => (version, ""),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(rest);
    Version::parse(&padded).ok()
}

/// Compare two version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (normalize(a), normalize(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        _ => compare_segments(a, b),
    }
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    let split = |s: &str| -> Vec<String> {
        s.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    };
    let (sa, sb) = (split(a), split(b));
    for i in 0..sa.len().max(sb.len()) {
        let pa = sa.get(i).map(String::as_str).unwrap_or("0");
        let pb = sb.get(i).map(String::as_str).unwrap_or("0");
        let ord = match (pa.parse::<u64>(), pb.parse::<u64>()) {
            (Ok(na), Ok(nb)) => na.cmp(&nb),
            _ => pa.cmp(pb),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// `a >= b` under [`compare`].
pub fn at_least(a: &str, b: &str) -> bool {
    compare(a, b) != Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_versions_are_padded() {
        assert_eq!(compare("6.4", "6.4.0"), Ordering::Equal);
        assert_eq!(compare("6.4", "6.4.2"), Ordering::Less);
        assert_eq!(compare("6.5", "6.4.2"), Ordering::Greater);
    }

    #[test]
    fn test_prerelease_sorts_before_release() {
        assert_eq!(compare("6.5-beta1", "6.5"), Ordering::Less);
        assert_eq!(strip_suffix("6.5-beta1"), "6.5");
    }

    #[test]
    fn test_four_part_versions_fall_back() {
        assert_eq!(compare("1.2.3.4", "1.2.3.10"), Ordering::Less);
        assert_eq!(compare("1.2.3.4", "1.2.3"), Ordering::Greater);
    }

    #[test]
    fn test_at_least() {
        assert!(at_least("6.4.2", "6.4"));
        assert!(at_least("6.4", "6.4"));
        assert!(!at_least("6.3", "6.4"));
    }

    #[test]
    fn test_leading_v() {
        assert_eq!(normalize("v1.2").unwrap(), Version::new(1, 2, 0));
    }
}
