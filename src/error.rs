//! Error types for xmlobject
//!
//! This module defines all error types used throughout the library.
//! Structural errors come from tree mutation, configuration errors from
//! provider lookup and configuration loading, and the (un)marshalling
//! errors from the DOM boundary.

use std::fmt;
use thiserror::Error;

/// Result type alias using xmlobject Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlobject operations
#[derive(Error, Debug)]
pub enum Error {
    /// Object tree integrity violation
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Missing provider or bad configuration document
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Object tree to DOM conversion failure
    #[error("marshalling error: {0}")]
    Marshalling(String),

    /// DOM to object tree conversion failure
    #[error("unmarshalling error: {0}")]
    Unmarshalling(#[from] UnmarshallingError),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Name error (invalid XML name)
    #[error("name error: {0}")]
    Name(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// XML parsing or writing error
    #[error("XML error: {0}")]
    Xml(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Whether this error is a structural-integrity violation
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Structural(_))
    }

    /// Whether this error is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

/// Object tree integrity violations.
///
/// These are raised before the offending mutation takes any effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// The handle does not name a live object (released, or from another tree)
    #[error("unknown node {0}")]
    UnknownNode(String),

    /// The child already belongs to a parent
    #[error("node {child} is already owned by {owner}")]
    AlreadyOwned {
        /// Child that was being attached
        child: String,
        /// Its current parent
        owner: String,
    },

    /// Attaching would make a node its own ancestor
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle {
        /// Child that was being attached
        child: String,
        /// Intended parent
        parent: String,
    },

    /// Position outside the list bounds
    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds {
        /// Requested position
        index: usize,
        /// Current length
        len: usize,
    },

    /// An object added through an index view does not match the view key
    #[error("node {node} does not match index key {key}")]
    KeyMismatch {
        /// Offending node
        node: String,
        /// View key
        key: String,
    },

    /// Operation requires a detached node
    #[error("node {0} is still attached to a parent")]
    StillAttached(String),

    /// Typed ID set on an object without a typed ID attribute
    #[error("node {0} has no typed ID attribute")]
    NoIdAttribute(String),
}

/// Configuration error with context
#[derive(Debug, Clone)]
pub struct ConfigurationError {
    /// Error message
    pub message: String,
    /// Location of the configuration document, if known
    pub location: Option<String>,
    /// Offending configuration fragment
    pub source: Option<String>,
}

impl ConfigurationError {
    /// Create a new configuration error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        if let Some(ref src) = self.source {
            write!(f, "\n\nSource:\n{}", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for ConfigurationError {}

/// Unmarshalling error with the path of the offending element
#[derive(Debug, Clone)]
pub struct UnmarshallingError {
    /// Error message
    pub message: String,
    /// Path to the element that failed
    pub path: Option<String>,
    /// Underlying reason
    pub reason: Option<String>,
}

impl UnmarshallingError {
    /// Create a new unmarshalling error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            reason: None,
        }
    }

    /// Set the path where unmarshalling failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for UnmarshallingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref reason) = self.reason {
            write!(f, "\n\nReason: {}", reason)?;
        }

        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }

        Ok(())
    }
}

impl std::error::Error for UnmarshallingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = ConfigurationError::new("unknown class 'NoSuchBuilder'")
            .with_location("config.xml")
            .with_source("<BuilderClass className='NoSuchBuilder'/>");

        let msg = format!("{}", err);
        assert!(msg.contains("unknown class 'NoSuchBuilder'"));
        assert!(msg.contains("Location:"));
        assert!(msg.contains("Source:"));
    }

    #[test]
    fn test_unmarshalling_error_display() {
        let err = UnmarshallingError::new("unexpected child element")
            .with_reason("Body must follow Header")
            .with_path("/Envelope/Body");

        let msg = format!("{}", err);
        assert!(msg.contains("unexpected child element"));
        assert!(msg.contains("Reason:"));
        assert!(msg.contains("Path: /Envelope/Body"));
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = StructuralError::UnknownNode("#3".to_string()).into();
        assert!(err.is_structural());
        assert!(!err.is_configuration());

        let err: Error = ConfigurationError::new("test").into();
        assert!(err.is_configuration());
    }
}
