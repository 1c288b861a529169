//! # xmlobject
//!
//! Typed XML object trees with marshalling to and from a DOM.
//!
//! ## Features
//!
//! - Arena-backed object trees with single-parent ownership
//! - Ordered child lists indexed by element name and schema type
//! - ID attribute registry resolvable from any node of a tree
//! - Cached DOM per object, invalidated by any change below it
//! - Provider registry (builder, marshaller, unmarshaller) loadable from
//!   configuration documents
//!
//! ## Example
//!
//! ```rust
//! use xmlobject::documents::Document;
//! use xmlobject::{Configuration, ObjectTree};
//!
//! let config = Configuration::new();
//! let document = Document::from_string(
//!     r#"<test:SimpleElement xmlns:test="http://www.example.org/testObjects" Id="Firefly"/>"#,
//! )?;
//!
//! let mut tree = ObjectTree::new();
//! let node = config.unmarshall(&mut tree, document.root().unwrap())?;
//! assert_eq!(tree.get(node)?.id(), Some("Firefly"));
//! assert_eq!(tree.resolve_id(node, "Firefly")?, Some(node));
//!
//! let element = config.marshall(&mut tree, node)?;
//! assert!(element.xml_eq(document.root().unwrap()));
//! # Ok::<(), xmlobject::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names and namespaces
pub mod namespaces;
pub mod names;
pub mod locations;

// Documents
pub mod loaders;
pub mod documents;

// Object model
pub mod object;
pub mod builders;
pub mod marshalling;
pub mod unmarshalling;

// Registry and built-in types
pub mod config;
pub mod objects;

// Re-exports for convenience
pub use config::{Configuration, ObjectProviders};
pub use error::{Error, Result};
pub use object::{NodeId, ObjectTree, XmlObject};

/// Version of the xmlobject library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XML Schema instance namespace (`xsi:type`)
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
