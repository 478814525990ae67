//! Reserved-identifier guard
//!
//! Denylist applied to every path before resolution and to transform names
//! before registration/lookup. Prototype-pollution identifiers are rejected
//! as exact segment matches; this is a guard, not a sandbox.

use crate::error::PropsError;

/// Segment names that are never legal in a path or as a transform name
pub const RESERVED_SEGMENTS: [&str; 8] = [
    "__proto__",
    "constructor",
    "prototype",
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
    "defineProperty",
];

/// Check whether a single segment is reserved
pub fn is_reserved(segment: &str) -> bool {
    RESERVED_SEGMENTS.contains(&segment)
}

/// Reject a dot-separated path containing any reserved segment
pub fn ensure_safe_path(path: &str) -> Result<(), PropsError> {
    for segment in path.split('.') {
        if is_reserved(segment) {
            return Err(PropsError::SecurityViolation {
                segment: segment.to_string(),
                path: path.to_string(),
            });
        }
    }
    Ok(())
}

/// Reject a reserved transform name
pub fn ensure_safe_name(name: &str) -> Result<(), PropsError> {
    if is_reserved(name) {
        return Err(PropsError::SecurityViolation {
            segment: name.to_string(),
            path: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_reserved_segments_are_rejected() {
        for segment in RESERVED_SEGMENTS {
            assert!(is_reserved(segment), "{segment} should be reserved");
            assert!(ensure_safe_path(segment).is_err());
            assert!(ensure_safe_name(segment).is_err());
        }
    }

    #[test]
    fn reserved_segment_anywhere_in_path_is_rejected() {
        assert!(ensure_safe_path("__proto__.polluted").is_err());
        assert!(ensure_safe_path("user.constructor").is_err());
        assert!(ensure_safe_path("a.prototype.b").is_err());
    }

    #[test]
    fn match_is_exact_not_substring() {
        // containing a reserved word is fine; only the exact segment is banned
        assert!(ensure_safe_path("my__proto__field").is_ok());
        assert!(ensure_safe_path("constructors").is_ok());
        assert!(ensure_safe_path("reconstructor.value").is_ok());
        assert!(ensure_safe_name("prototypes").is_ok());
    }

    #[test]
    fn ordinary_paths_pass() {
        assert!(ensure_safe_path("user.profile.name").is_ok());
        assert!(ensure_safe_path("items.0.price").is_ok());
        assert!(ensure_safe_name("uppercase").is_ok());
    }

    #[test]
    fn violation_reports_the_offending_segment() {
        let err = ensure_safe_path("user.__proto__.x").unwrap_err();
        match err {
            PropsError::SecurityViolation { segment, path } => {
                assert_eq!(segment, "__proto__");
                assert_eq!(path, "user.__proto__.x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
