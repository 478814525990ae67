//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Failures raised by the path and template APIs.
///
/// Missing keys and exhausted traversals are not failures in this crate:
/// reads resolve to the configured fallback instead. These variants cover
/// the cases that genuinely cannot proceed.
#[derive(Error, Debug)]
pub enum PropsError {
    #[error("Cannot {op} path '{path}' on a null container")]
    NullContainer { op: &'static str, path: String },

    #[error("Invalid path '{path}': expected non-empty dot-separated segments")]
    InvalidPath { path: String },

    #[error("Reserved segment '{segment}' rejected in '{path}'")]
    SecurityViolation { segment: String, path: String },

    #[error("Empty path in template expression '{expr}'")]
    EmptyPath { expr: String },

    #[error("Transform '{name}' failed at path '{path}': {source}")]
    TransformFailure {
        name: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Template data must be an object or array, got {kind}")]
    InvalidTemplateData { kind: &'static str },
}

impl FixSuggestion for PropsError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            PropsError::NullContainer { .. } => {
                Some("Pass an object or array as the data root")
            }
            PropsError::InvalidPath { .. } => {
                Some("Use dot-separated segments: parent.child.0")
            }
            PropsError::SecurityViolation { .. } => {
                Some("Rename the key - prototype-related identifiers are always rejected")
            }
            PropsError::EmptyPath { .. } => {
                Some("Put a path before the first '|': {{path | transform}}")
            }
            PropsError::TransformFailure { .. } => {
                Some("Check the transform's arguments against what it expects")
            }
            PropsError::InvalidTemplateData { .. } => {
                Some("Render with an object or array data context")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path() {
        let err = PropsError::InvalidPath {
            path: "a..b".to_string(),
        };
        assert!(err.to_string().contains("a..b"));
    }

    #[test]
    fn display_includes_reserved_segment() {
        let err = PropsError::SecurityViolation {
            segment: "__proto__".to_string(),
            path: "user.__proto__.x".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("__proto__"));
        assert!(msg.contains("user.__proto__.x"));
    }

    #[test]
    fn transform_failure_preserves_source() {
        let err = PropsError::TransformFailure {
            name: "multiply".to_string(),
            path: "price".to_string(),
            source: anyhow::anyhow!("expected a number"),
        };
        assert!(err.to_string().contains("multiply"));
        assert!(err.to_string().contains("expected a number"));
    }

    #[test]
    fn every_variant_has_a_suggestion() {
        let errors = [
            PropsError::NullContainer {
                op: "get",
                path: "a".into(),
            },
            PropsError::InvalidPath { path: String::new() },
            PropsError::SecurityViolation {
                segment: "constructor".into(),
                path: "constructor".into(),
            },
            PropsError::EmptyPath {
                expr: "| upper".into(),
            },
            PropsError::TransformFailure {
                name: "t".into(),
                path: "p".into(),
                source: anyhow::anyhow!("boom"),
            },
            PropsError::InvalidTemplateData { kind: "string" },
        ];
        for err in errors {
            assert!(err.fix_suggestion().is_some());
        }
    }
}
