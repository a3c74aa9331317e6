//! Error types for policy storage, resolution and rule construction.

use std::fmt;

use arbor_core::CoreError;

// =============================================================================
// Storage Error
// =============================================================================

/// Errors reported by a [`PolicyStore`](crate::storage::PolicyStore) adapter.
///
/// A storage failure is never a "no policy" answer; callers must surface it.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing store could not be reached.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// =============================================================================
// Policy Error
// =============================================================================

/// Errors that can occur while resolving or building policies.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// The resource model is broken (malformed hierarchy, invalid resource).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The policy store failed.
    #[error("Policy store failure: {0}")]
    Storage(#[from] StorageError),

    /// No constructor is registered under the given rule identifier.
    #[error("Unknown {level} rule: {id}")]
    UnknownRule {
        /// Rule level the lookup was made for.
        level: &'static str,
        /// The identifier that was requested.
        id: String,
    },

    /// A registered rule rejected its configuration parameters.
    #[error("Invalid parameters for rule '{id}': {message}")]
    InvalidRuleParams {
        /// The rule identifier.
        id: String,
        /// What was wrong with the parameters.
        message: String,
    },
}

impl PolicyError {
    /// Creates a new `UnknownRule` error.
    #[must_use]
    pub fn unknown_rule(level: &'static str, id: impl Into<String>) -> Self {
        Self::UnknownRule {
            level,
            id: id.into(),
        }
    }

    /// Creates a new `InvalidRuleParams` error.
    #[must_use]
    pub fn invalid_rule_params(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRuleParams {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the error comes from a malformed resource hierarchy.
    #[must_use]
    pub fn is_malformed_hierarchy(&self) -> bool {
        matches!(self, Self::Core(err) if err.is_malformed_hierarchy())
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Core(err) if err.is_malformed_hierarchy() => ErrorCategory::Hierarchy,
            Self::Core(_) => ErrorCategory::Validation,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::UnknownRule { .. } | Self::InvalidRuleParams { .. } => {
                ErrorCategory::Configuration
            }
        }
    }
}

/// Categories of policy errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Broken resource tree.
    Hierarchy,
    /// Invalid resource data.
    Validation,
    /// Store adapter failure.
    Storage,
    /// Rule registry / parameter problem.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hierarchy => write!(f, "hierarchy"),
            Self::Validation => write!(f, "validation"),
            Self::Storage => write!(f, "storage"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
