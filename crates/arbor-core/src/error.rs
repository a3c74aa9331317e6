use thiserror::Error;

/// Core error types for Arbor resource and request modelling
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Malformed hierarchy at {resource}: {reason}")]
    MalformedHierarchy { resource: String, reason: String },

    #[error("Invalid resource data: {message}")]
    InvalidResource { message: String },

    #[error("Invalid request context: {0}")]
    InvalidContext(String),
}

impl CoreError {
    /// Create a new MalformedHierarchy error
    pub fn malformed_hierarchy(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedHierarchy {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidResource error
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            message: message.into(),
        }
    }

    /// Create a new InvalidContext error
    pub fn invalid_context(message: impl Into<String>) -> Self {
        Self::InvalidContext(message.into())
    }

    /// Check if this error reports a broken resource tree.
    ///
    /// These are construction-time defects in whatever assembled the resource
    /// graph and must never be read as an access decision.
    pub fn is_malformed_hierarchy(&self) -> bool {
        matches!(self, Self::MalformedHierarchy { .. })
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedHierarchy { .. } => ErrorCategory::Hierarchy,
            Self::InvalidResource { .. } | Self::InvalidContext(_) => ErrorCategory::Validation,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Hierarchy,
    Validation,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hierarchy => write!(f, "hierarchy"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_hierarchy_error() {
        let err = CoreError::malformed_hierarchy("/file/temp", "parent chain exceeds 64 levels");
        assert_eq!(
            err.to_string(),
            "Malformed hierarchy at /file/temp: parent chain exceeds 64 levels"
        );
        assert!(err.is_malformed_hierarchy());
        assert_eq!(err.category(), ErrorCategory::Hierarchy);
    }

    #[test]
    fn test_validation_errors() {
        let err = CoreError::invalid_resource("leaf requires a type");
        assert_eq!(err.to_string(), "Invalid resource data: leaf requires a type");
        assert!(!err.is_malformed_hierarchy());
        assert_eq!(err.category(), ErrorCategory::Validation);

        let err = CoreError::invalid_context("missing purpose");
        assert_eq!(err.to_string(), "Invalid request context: missing purpose");
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::Hierarchy.to_string(), "hierarchy");
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
    }
}
