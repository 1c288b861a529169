//! Resource loading utilities
//!
//! This module reads configuration and instance documents from a
//! [`Location`] and parses them into a [`Document`].

use crate::documents::{Document, ParseOptions};
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use std::fs;

/// Resource loader for configuration and instance documents
#[derive(Debug, Clone)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
    /// Whether to allow remote resources
    allow_remote: bool,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            allow_remote: false,
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether to allow remote resources
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }

    /// Limits applied by this loader
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        match location {
            Location::Path(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
                })?;

                self.limits.check_document_size(content.len())?;

                Ok(content)
            }
            Location::Url(url) => {
                if !self.allow_remote {
                    return Err(Error::Resource(format!(
                        "Remote resources are not allowed: {}",
                        url
                    )));
                }

                // TODO: fetch http(s) locations once a blocking client is chosen
                Err(Error::Resource(format!(
                    "URL loading not supported: {}",
                    url
                )))
            }
            Location::String(s) => {
                self.limits.check_document_size(s.len())?;
                Ok(s.clone())
            }
        }
    }

    /// Load and parse a document
    pub fn load_document(&self, location: &Location, options: &ParseOptions) -> Result<Document> {
        let content = self.load(location)?;
        Document::parse_with(&content, options)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
