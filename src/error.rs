//! Error types for the serving layer
//!
//! One taxonomy covers the whole request path: client-input faults
//! (malformed payloads, contract violations), the distinct
//! capability-unavailable signal, startup artifact problems, and opaque
//! internal faults. Contract violations enumerate every problem found, not
//! just the first.

use thiserror::Error;

/// Main error type for serving operations
#[derive(Error, Debug)]
pub enum ServingError {
    /// Malformed payload shape or out-of-bounds batch size
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Raw records violated the raw-input schema; lists every missing
    /// field across the whole batch
    #[error("Raw schema violation: missing required fields [{}]", .missing.join(", "))]
    Schema {
        /// Sorted, deduplicated missing field names
        missing: Vec<String>,
    },

    /// Engineered features violated the model's feature manifest; all
    /// violations are reported together
    #[error(
        "Feature contract violation: missing [{}], unexpected [{}], expected {expected} columns, got {actual}",
        .missing.join(", "),
        .extra.join(", ")
    )]
    FeatureContract {
        /// Manifest columns absent from the table, in manifest order
        missing: Vec<String>,
        /// Table columns the manifest does not declare, in table order
        extra: Vec<String>,
        /// Column count the manifest expects
        expected: usize,
        /// Column count the table carries
        actual: usize,
    },

    /// The explanation capability is not present in this deployment
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Startup artifact bundle could not be loaded or is inconsistent
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Unexpected internal fault; logged server-side, surfaced opaquely
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServingError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        ServingError::InvalidInput(msg.into())
    }

    /// Create an artifact error
    pub fn artifact(msg: impl Into<String>) -> Self {
        ServingError::Artifact(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        ServingError::Internal(msg.into())
    }

    /// Create a capability-unavailable error
    pub fn capability_unavailable(msg: impl Into<String>) -> Self {
        ServingError::CapabilityUnavailable(msg.into())
    }

    /// Check if this is a client-input fault (vs a server-side fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServingError::InvalidInput(_)
                | ServingError::Schema { .. }
                | ServingError::FeatureContract { .. }
        )
    }
}

impl From<std::io::Error> for ServingError {
    fn from(err: std::io::Error) -> Self {
        ServingError::Artifact(err.to_string())
    }
}

/// Result type alias for serving operations
pub type Result<T> = std::result::Result<T, ServingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_all_fields() {
        let err = ServingError::Schema {
            missing: vec!["loan_amnt".to_string(), "person_age".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("loan_amnt"));
        assert!(msg.contains("person_age"));
    }

    #[test]
    fn test_feature_contract_error_lists_both_directions() {
        let err = ServingError::FeatureContract {
            missing: vec!["bar".to_string()],
            extra: vec!["foo".to_string()],
            expected: 26,
            actual: 26,
        };
        let msg = err.to_string();
        assert!(msg.contains("bar"));
        assert!(msg.contains("foo"));
        assert!(msg.contains("26"));
    }

    #[test]
    fn test_is_client_error() {
        assert!(ServingError::invalid_input("bad").is_client_error());
        assert!(ServingError::Schema { missing: vec![] }.is_client_error());
        assert!(!ServingError::capability_unavailable("no explainer").is_client_error());
        assert!(!ServingError::internal("boom").is_client_error());
        assert!(!ServingError::artifact("missing file").is_client_error());
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(
            ServingError::invalid_input("x"),
            ServingError::InvalidInput(_)
        ));
        assert!(matches!(
            ServingError::artifact("x"),
            ServingError::Artifact(_)
        ));
        assert!(matches!(
            ServingError::internal("x"),
            ServingError::Internal(_)
        ));
    }
}
