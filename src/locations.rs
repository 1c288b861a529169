//! Document location resolution
//!
//! Configuration documents and instance documents are addressed by a
//! [`Location`]: a file path, a URL, or an in-memory string.

use crate::error::Result;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Resource location - can be a URL, file path, or literal document
#[derive(Debug, Clone)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL (http, https, ...)
    Url(Url),
    /// In-memory document text
    String(String),
}

impl Location {
    /// Create a location from a string (auto-detect type)
    ///
    /// Text that starts with `<` is treated as a literal document.
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim_start().starts_with('<') {
            return Ok(Location::String(s.to_string()));
        }

        if let Ok(url) = Url::parse(s) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Ok(Location::Path(path));
                }
            } else if url.scheme().len() > 1 {
                // single letters are Windows drive prefixes, not schemes
                return Ok(Location::Url(url));
            }
        }

        Ok(Location::Path(PathBuf::from(s)))
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Path(p) => write!(f, "{}", p.display()),
            Location::Url(u) => write!(f, "{}", u),
            Location::String(_) => write!(f, "<in-memory document>"),
        }
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Path(path)
    }
}
