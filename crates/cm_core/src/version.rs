//! Version comparison for installed vs incoming content.
//!
//! Content authors rarely follow semantic versioning: `v1.2`, `1.05` and
//! `2.0.1.4` all show up in the wild. Parsing tries strict semver first and
//! then falls back to a dotted-numeric form. Anything else is "unknown" and
//! never compares as newer or older.

use std::cmp::Ordering;
use std::fmt;

/// A parsed content version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentVersion {
    /// A strict semantic version (`1.2.3`, `2.0.0-beta.1`).
    Semver(semver::Version),
    /// Dotted numeric components (`1.05` -> `[1, 5]`).
    Dotted(Vec<u64>),
}

impl ContentVersion {
    fn numeric_components(&self) -> Vec<u64> {
        match self {
            ContentVersion::Semver(v) => vec![v.major, v.minor, v.patch],
            ContentVersion::Dotted(parts) => parts.clone(),
        }
    }

    /// Compare two versions; `1.2` and `1.2.0` are equal.
    pub fn compare(&self, other: &ContentVersion) -> Ordering {
        if let (ContentVersion::Semver(a), ContentVersion::Semver(b)) = (self, other) {
            return a.cmp(b);
        }

        let a = self.numeric_components();
        let b = other.numeric_components();
        let len = a.len().max(b.len());
        for i in 0..len {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            match x.cmp(&y) {
                Ordering::Equal => continue,
                other => return other,
            }
        }

        // Same numbers: a pre-release sorts before the plain release.
        match (self, other) {
            (ContentVersion::Semver(a), _) if !a.pre.is_empty() => Ordering::Less,
            (_, ContentVersion::Semver(b)) if !b.pre.is_empty() => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for ContentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentVersion::Semver(v) => write!(f, "{v}"),
            ContentVersion::Dotted(parts) => {
                let joined = parts
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(".");
                f.write_str(&joined)
            }
        }
    }
}

/// Parse a version string, returning `None` when it is not recognizable.
pub fn parse_version(value: &str) -> Option<ContentVersion> {
    let trimmed = value.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(v) = semver::Version::parse(trimmed) {
        return Some(ContentVersion::Semver(v));
    }

    let pieces: Vec<&str> = trimmed.split('.').collect();
    let mut parts = Vec::with_capacity(pieces.len());
    for (i, piece) in pieces.iter().enumerate() {
        let digits: String = piece.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return None;
        }
        // Only the last component may carry a suffix such as `1.2b`.
        if digits.len() != piece.len() && i + 1 != pieces.len() {
            return None;
        }
        parts.push(digits.parse::<u64>().ok()?);
    }
    Some(ContentVersion::Dotted(parts))
}

/// Compare two optional version strings; `None` when either is absent or unparsable.
pub fn compare_versions(a: Option<&str>, b: Option<&str>) -> Option<Ordering> {
    let a = parse_version(a?)?;
    let b = parse_version(b?)?;
    Some(a.compare(&b))
}

/// `true` only when both versions parse and `a` is strictly newer than `b`.
pub fn is_version_newer_than(a: Option<&str>, b: Option<&str>) -> bool {
    compare_versions(a, b) == Some(Ordering::Greater)
}

/// `true` only when both versions parse and `a` is strictly older than `b`.
pub fn is_version_older_than(a: Option<&str>, b: Option<&str>) -> bool {
    compare_versions(a, b) == Some(Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_semver_and_dotted() {
        assert!(matches!(
            parse_version("1.2.3"),
            Some(ContentVersion::Semver(_))
        ));
        assert_eq!(
            parse_version("v1.05"),
            Some(ContentVersion::Dotted(vec![1, 5]))
        );
        assert_eq!(
            parse_version("2.0.1.4"),
            Some(ContentVersion::Dotted(vec![2, 0, 1, 4]))
        );
        assert_eq!(
            parse_version("1.2b"),
            Some(ContentVersion::Dotted(vec![1, 2]))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_version(""), None);
        assert_eq!(parse_version("final"), None);
        assert_eq!(parse_version("1.x.2"), None);
        assert_eq!(parse_version("1a.2"), None);
    }

    #[test]
    fn test_newer_and_older() {
        assert!(is_version_newer_than(Some("1.1"), Some("1.0")));
        assert!(is_version_older_than(Some("0.9"), Some("1.0.0")));
        assert!(!is_version_newer_than(Some("1.2"), Some("1.2.0")));
        assert!(!is_version_older_than(Some("1.2"), Some("1.2.0")));
    }

    #[test]
    fn test_unknown_never_compares() {
        assert!(!is_version_newer_than(Some("release"), Some("1.0")));
        assert!(!is_version_older_than(Some("1.0"), None));
        assert!(!is_version_newer_than(None, None));
        assert_eq!(compare_versions(Some("alpha"), Some("beta")), None);
    }

    #[test]
    fn test_prerelease_sorts_first() {
        assert!(is_version_older_than(Some("2.0.0-beta.1"), Some("2.0.0")));
        assert!(is_version_newer_than(Some("2.0.0-beta.2"), Some("2.0.0-beta.1")));
    }
}
