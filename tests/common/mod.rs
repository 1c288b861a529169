//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use xmlobject::documents::{Document, Element};
use xmlobject::objects::SimpleXmlObjectBuilder;
use xmlobject::{NodeId, ObjectTree};

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

/// Path of a single fixture file
pub fn fixture(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Parse a fixture document
pub fn load_fixture(name: &str) -> Document {
    let content = std::fs::read_to_string(fixture(name))
        .unwrap_or_else(|e| panic!("cannot read fixture {}: {}", name, e));
    Document::from_string(&content).unwrap_or_else(|e| panic!("cannot parse fixture {}: {}", name, e))
}

/// Build a `SimpleElement`, optionally with an ID
pub fn simple(tree: &mut ObjectTree, id: Option<&str>) -> NodeId {
    let node = SimpleXmlObjectBuilder.build_default(tree).unwrap();
    if id.is_some() {
        tree.set_id(node, id).unwrap();
    }
    node
}

/// Build a `SimpleElement` with text content
pub fn simple_with_text(tree: &mut ObjectTree, text: &str) -> NodeId {
    let node = SimpleXmlObjectBuilder.build_default(tree).unwrap();
    tree.set_text(node, Some(text)).unwrap();
    node
}

/// Structural XML equality, with a readable diff on failure
pub fn assert_xml_eq(actual: &Element, expected: &Element) {
    if actual.xml_eq(expected) {
        return;
    }
    let actual_xml = Document::with_root(actual.clone()).to_pretty_string().unwrap();
    let expected_xml = Document::with_root(expected.clone()).to_pretty_string().unwrap();
    pretty_assertions::assert_eq!(actual_xml, expected_xml);
    panic!("elements differ structurally:\n{}", actual_xml);
}
