//! Error types for the configuration core
//!
//! Collaborators (storage, templates, generators) report failures as
//! `anyhow::Error`; the core wraps them into these enums at its boundaries so
//! callers can inspect why an operation did not complete.

use thiserror::Error;

/// Failures of store, link and identity operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration not found: {uid}")]
    NotFound { uid: String },

    #[error("Configuration name already in use: {name}")]
    NameTaken { name: String },

    #[error("Configuration name must not be empty")]
    EmptyName,

    #[error("Configuration {uid} cannot link {tag} to itself")]
    SelfLink { uid: String, tag: String },

    #[error("Linking {tag} of {uid} to {target} would create a cycle")]
    LinkCycle { uid: String, tag: String, target: String },

    #[error("Configuration has no identity")]
    MissingIdentity,

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of the merge pipelines
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Merge lock busy after {timeout_ms}ms")]
    LockTimeout { timeout_ms: u64 },

    #[error("Failed to load template {template}: {reason}")]
    Template { template: String, reason: String },

    #[error("Template {template} is not a valid document: {reason}")]
    TemplateParse { template: String, reason: String },

    #[error("Template document has no {field} object")]
    MalformedDocument { field: String },

    #[error("No kneeboard templates extracted from {template}")]
    NoTemplates { template: String },

    #[error("System {tag} failed to merge: {reason}")]
    System { tag: String, reason: String },

    #[error("Kneeboard generator failed: {reason}")]
    Generator { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MergeError {
    /// Lock contention is retryable, everything else is a failed merge
    pub fn is_retryable(&self) -> bool {
        matches!(self, MergeError::LockTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let errors = vec![
            (
                ConfigError::NameTaken { name: "Alpha".to_string() },
                "Configuration name already in use: Alpha",
            ),
            (
                ConfigError::SelfLink { uid: "u1".to_string(), tag: "RADIO".to_string() },
                "Configuration u1 cannot link RADIO to itself",
            ),
            (
                ConfigError::NotFound { uid: "u9".to_string() },
                "Configuration not found: u9",
            ),
        ];

        for (error, expected) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_storage_error_keeps_context_chain() {
        let err = anyhow::anyhow!("disk full").context("Failed to write record");
        let config_err: ConfigError = err.into();
        let text = config_err.to_string();
        assert!(text.contains("Failed to write record"));
        assert!(text.contains("disk full"));
    }

    #[test]
    fn test_only_lock_timeout_is_retryable() {
        assert!(MergeError::LockTimeout { timeout_ms: 100 }.is_retryable());
        assert!(!MergeError::NoTemplates { template: "t".to_string() }.is_retryable());
    }
}
