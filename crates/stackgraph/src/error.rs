//! Error types for stack generation.
//!
//! Every error is fatal to a generation run. Categories exist so the
//! caller can tell an environment problem (the address lookup failed)
//! apart from a declaration bug in the code that builds the graph.

use std::fmt;
use thiserror::Error;

/// Result type alias for stack generation.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of generation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The runtime environment could not provide required data.
    Environment,
    /// A resource, parameter or output was declared incorrectly.
    Declaration,
    /// The stack configuration is invalid.
    Configuration,
    /// Rendering the document failed.
    Internal,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Environment => "Environment lookup failed",
            Self::Declaration => "Invalid graph declaration",
            Self::Configuration => "Invalid stack configuration",
            Self::Internal => "Template rendering failed",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Environment => {
                "Check your internet connection, or pass the address explicitly with --address"
            }
            Self::Declaration => "Declare every resource after the resources it references",
            Self::Configuration => "Fix the reported field in your config file or CLI overrides",
            Self::Internal => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while building or rendering a stack.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller address could not be resolved or parsed.
    #[error("address resolution failed: {message}")]
    Resolution {
        /// Details from the resolver or parser
        message: String,
    },

    /// A logical name was declared twice.
    #[error("duplicate logical name: {name}")]
    DuplicateName {
        /// The colliding name
        name: String,
    },

    /// A declaration referenced a name that is not in the graph yet.
    #[error("{from} references undeclared name: {target}")]
    DanglingReference {
        /// The declaration holding the reference
        from: String,
        /// The missing target
        target: String,
    },

    /// A declaration was attempted after the graph was frozen.
    #[error("graph is frozen, cannot {operation}")]
    GraphFrozen {
        /// The rejected operation
        operation: String,
    },

    /// A logical name is not alphanumeric.
    #[error("invalid logical name '{name}': must be non-empty and alphanumeric")]
    InvalidName {
        /// The rejected name
        name: String,
    },

    /// A configuration field holds an unusable value.
    #[error("invalid config field {field}: {message}")]
    InvalidConfig {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// JSON rendering failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a resolution error.
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Resolution { .. } => ErrorCategory::Environment,
            Error::DuplicateName { .. }
            | Error::DanglingReference { .. }
            | Error::GraphFrozen { .. }
            | Error::InvalidName { .. } => ErrorCategory::Declaration,
            Error::InvalidConfig { .. } => ErrorCategory::Configuration,
            Error::Serialization(_) => ErrorCategory::Internal,
        }
    }
}
