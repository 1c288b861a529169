//! Marshalling and unmarshalling against fixture documents

mod common;

use common::{assert_xml_eq, load_fixture, simple, simple_with_text};
use std::sync::Arc;
use xmlobject::documents::{Document, Element};
use xmlobject::error::{Error, Result, UnmarshallingError};
use xmlobject::marshalling::{self, ElementSigner, SigningMarshaller};
use xmlobject::namespaces::QName;
use xmlobject::object::{CacheLookup, IndexKey};
use xmlobject::objects::simple::NAMESPACE as TEST_NAMESPACE;
use xmlobject::objects::{
    ElementProxy, ElementProxyBuilder, ElementProxyMarshaller, SimpleXmlObject,
};
use xmlobject::unmarshalling::Unmarshaller;
use xmlobject::{Configuration, NodeId, ObjectProviders, ObjectTree};

// ============================================================================
// Simple object with an ID attribute
// ============================================================================

#[test]
fn test_marshall_object_with_id() {
    let config = Configuration::new();
    let expected = load_fixture("SimpleXMLObjectWithAttribute.xml");

    let mut tree = ObjectTree::new();
    let node = simple(&mut tree, Some("Firefly"));
    let element = config.marshall(&mut tree, node).unwrap();

    assert_xml_eq(&element, expected.root().unwrap());
}

#[test]
fn test_marshalled_xml_parses_back() {
    let config = Configuration::new();
    let expected = load_fixture("SimpleXMLObjectWithAttribute.xml");

    let mut tree = ObjectTree::new();
    let node = simple(&mut tree, Some("Firefly"));
    let xml = config.marshall(&mut tree, node).unwrap().to_xml_string().unwrap();

    assert!(xml.contains("xmlns:test=\"http://www.example.org/testObjects\""));
    let reparsed = Document::from_string(&xml).unwrap();
    assert_xml_eq(reparsed.root().unwrap(), expected.root().unwrap());
}

#[test]
fn test_unmarshall_object_with_id() {
    let config = Configuration::new();
    let document = load_fixture("SimpleXMLObjectWithAttribute.xml");

    let mut tree = ObjectTree::new();
    let node = config.unmarshall(&mut tree, document.root().unwrap()).unwrap();
    let object = tree.get(node).unwrap();

    assert_eq!(object.element_name(), &SimpleXmlObject::element_name());
    assert_eq!(object.id(), Some("Firefly"));
    assert!(object.attributes().is_empty());
    assert_eq!(tree.resolve_id(node, "Firefly").unwrap(), Some(node));
}

// ============================================================================
// Nested content
// ============================================================================

fn build_content_tree(tree: &mut ObjectTree) -> NodeId {
    let root = simple(tree, None);
    let first = simple_with_text(tree, "Content1");
    let second = simple_with_text(tree, "Content2");
    let third = simple(tree, None);
    let nested = simple_with_text(tree, "Content3");

    tree.children_mut(third).unwrap().add(nested).unwrap();
    let mut children = tree.children_mut(root).unwrap();
    for child in [first, second, third] {
        children.add(child).unwrap();
    }
    root
}

#[test]
fn test_unmarshall_nested_content() {
    let config = Configuration::new();
    let document = load_fixture("SimpleXMLObjectWithContent.xml");

    let mut tree = ObjectTree::new();
    let root = config.unmarshall(&mut tree, document.root().unwrap()).unwrap();

    let children = tree.children(root).unwrap();
    assert_eq!(children.len(), 3);
    assert_eq!(
        children
            .indexed(&SimpleXmlObject::children_key())
            .unwrap()
            .len(),
        3
    );
    assert_eq!(tree.get(root).unwrap().text(), None);

    let texts: Vec<Option<&str>> = children
        .iter()
        .map(|c| tree.get(c).unwrap().text())
        .collect();
    assert_eq!(texts, vec![Some("Content1"), Some("Content2"), None]);

    let third = children.get(2).unwrap();
    let nested = tree.children(third).unwrap().get(0).unwrap();
    assert_eq!(tree.get(nested).unwrap().text(), Some("Content3"));
    assert_eq!(tree.root(nested).unwrap(), root);
}

#[test]
fn test_marshall_built_content_tree() {
    let config = Configuration::new();
    let expected = load_fixture("SimpleXMLObjectWithContent.xml");

    let mut tree = ObjectTree::new();
    let root = build_content_tree(&mut tree);
    let element = config.marshall(&mut tree, root).unwrap();

    assert_xml_eq(&element, expected.root().unwrap());
    assert_eq!(element.child_elements().count(), 3);
}

#[test]
fn test_rebuilt_dom_matches_source() {
    let config = Configuration::new();
    let document = load_fixture("SimpleXMLObjectWithContent.xml");

    let mut tree = ObjectTree::new();
    let root = config.unmarshall(&mut tree, document.root().unwrap()).unwrap();
    for node in tree.descendants(root).unwrap() {
        tree.mark_dirty(node).unwrap();
    }
    assert!(matches!(tree.dom_cache(root).unwrap(), CacheLookup::Stale));

    let element = config.marshall(&mut tree, root).unwrap();
    assert_xml_eq(&element, document.root().unwrap());
}

#[test]
fn test_marshall_into_parent_element() {
    let config = Configuration::new();
    let mut tree = ObjectTree::new();
    let node = simple(&mut tree, Some("Firefly"));

    let mut wrapper = Element::new(QName::prefixed("urn:example:wrapper", "Wrapper", "w"));
    marshalling::marshall_into(&config, &mut tree, node, &mut wrapper).unwrap();

    let children: Vec<&Element> = wrapper.child_elements().collect();
    assert_eq!(children.len(), 1);
    assert_eq!(
        children[0].attribute_value(&SimpleXmlObject::id_attribute_name()),
        Some("Firefly")
    );
}

// ============================================================================
// DOM cache
// ============================================================================

#[test]
fn test_unmarshalled_objects_cache_their_source() {
    let config = Configuration::new();
    let document = load_fixture("SimpleXMLObjectWithContent.xml");

    let mut tree = ObjectTree::new();
    let root = config.unmarshall(&mut tree, document.root().unwrap()).unwrap();

    for node in tree.descendants(root).unwrap() {
        assert!(tree.dom_cache(node).unwrap().is_fresh(), "{} not cached", node);
    }
    let cached = tree.dom_cache(root).unwrap().element().unwrap();
    assert_xml_eq(cached, document.root().unwrap());
}

#[test]
fn test_change_invalidates_only_the_path_to_root() {
    let config = Configuration::new();
    let document = load_fixture("SimpleXMLObjectWithContent.xml");

    let mut tree = ObjectTree::new();
    let root = config.unmarshall(&mut tree, document.root().unwrap()).unwrap();
    let first = tree.children(root).unwrap().get(0).unwrap();
    let third = tree.children(root).unwrap().get(2).unwrap();
    let nested = tree.children(third).unwrap().get(0).unwrap();

    tree.set_text(nested, Some("Changed")).unwrap();

    for node in [root, third, nested] {
        assert!(matches!(tree.dom_cache(node).unwrap(), CacheLookup::Stale));
    }
    assert!(tree.dom_cache(first).unwrap().is_fresh());

    let element = config.marshall(&mut tree, root).unwrap();
    let third_element = element.child_elements().nth(2).unwrap();
    let nested_element = third_element.child_elements().next().unwrap();
    assert_eq!(nested_element.text().as_deref(), Some("Changed"));

    for node in tree.descendants(root).unwrap() {
        assert!(tree.dom_cache(node).unwrap().is_fresh());
    }
}

#[test]
fn test_structural_change_invalidates_parent() {
    let config = Configuration::new();
    let mut tree = ObjectTree::new();
    let root = build_content_tree(&mut tree);
    config.marshall(&mut tree, root).unwrap();

    let extra = simple_with_text(&mut tree, "Content4");
    tree.children_mut(root).unwrap().add(extra).unwrap();
    assert!(matches!(tree.dom_cache(root).unwrap(), CacheLookup::Stale));
    assert!(matches!(tree.dom_cache(extra).unwrap(), CacheLookup::Empty));

    let element = config.marshall(&mut tree, root).unwrap();
    assert_eq!(element.child_elements().count(), 4);
}

// ============================================================================
// Schema types
// ============================================================================

#[test]
fn test_xsi_type_round_trip() {
    let config = Configuration::new();
    let document = Document::from_string(
        r#"<test:Other xmlns:test="http://www.example.org/testObjects"
                       xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                       xsi:type="test:SimpleElementType" Id="typed-1"/>"#,
    )
    .unwrap();

    let mut tree = ObjectTree::new();
    let node = config.unmarshall(&mut tree, document.root().unwrap()).unwrap();
    let object = tree.get(node).unwrap();
    assert_eq!(object.schema_type(), Some(&SimpleXmlObject::type_name()));
    assert_eq!(object.id(), Some("typed-1"));
    assert_eq!(
        object.index_keys(),
        vec![
            IndexKey::Element(QName::namespaced(TEST_NAMESPACE, "Other")),
            IndexKey::Type(SimpleXmlObject::type_name()),
        ]
    );

    tree.mark_dirty(node).unwrap();
    let element = config.marshall(&mut tree, node).unwrap();
    assert_xml_eq(&element, document.root().unwrap());
}

#[test]
fn test_detached_typed_child_keeps_inherited_type_prefix() {
    let config = Configuration::new();
    let document = Document::from_string(
        r#"<test:SimpleElement xmlns:test="http://www.example.org/testObjects"
                               xmlns:tt="http://www.example.org/testObjects"
                               xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
               <test:SimpleElement xsi:type="tt:SimpleElementType" Id="c"/>
           </test:SimpleElement>"#,
    )
    .unwrap();

    let mut tree = ObjectTree::new();
    let root = config.unmarshall(&mut tree, document.root().unwrap()).unwrap();
    let child = tree.children(root).unwrap().get(0).unwrap();
    assert!(tree.detach(child).unwrap());

    let reload = |xml: &str| {
        let reparsed = Document::from_string(xml).unwrap();
        let mut fresh = ObjectTree::new();
        let node = config.unmarshall(&mut fresh, reparsed.root().unwrap()).unwrap();
        let object = fresh.get(node).unwrap();
        assert_eq!(object.schema_type(), Some(&SimpleXmlObject::type_name()));
        assert_eq!(object.id(), Some("c"));
    };

    // the cached source element
    let cached = config.marshall(&mut tree, child).unwrap().to_xml_string().unwrap();
    assert!(cached.contains(r#"xmlns:tt="http://www.example.org/testObjects""#));
    reload(&cached);

    // a DOM rebuilt from the object
    tree.mark_dirty(child).unwrap();
    let rebuilt = config.marshall(&mut tree, child).unwrap().to_xml_string().unwrap();
    reload(&rebuilt);
}

// ============================================================================
// Type-specific unmarshallers
// ============================================================================

const ENVELOPE_NS: &str = "urn:example:envelope";

fn envelope_name(local: &str) -> QName {
    QName::prefixed(ENVELOPE_NS, local, "env")
}

/// Accepts an optional `Header` followed by exactly one `Body`
struct EnvelopeUnmarshaller;

impl Unmarshaller for EnvelopeUnmarshaller {
    fn process_child_element(&self, tree: &mut ObjectTree, parent: NodeId, child: NodeId) -> Result<()> {
        let name = tree.get(child)?.element_name().clone();
        let has_body = tree
            .children(parent)?
            .indexed(&IndexKey::Element(envelope_name("Body")))
            .map_or(false, |b| !b.is_empty());

        let reason = if name == envelope_name("Header") && !tree.children(parent)?.is_empty() {
            Some("Header must be the first child")
        } else if name == envelope_name("Body") && has_body {
            Some("only one Body is allowed")
        } else if name != envelope_name("Header") && name != envelope_name("Body") {
            Some("only Header and Body are allowed")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(UnmarshallingError::new(format!("unexpected child {}", name))
                .with_reason(reason)
                .into()),
            None => tree.children_mut(parent)?.add(child),
        }
    }
}

fn envelope_configuration() -> Configuration {
    let mut config = Configuration::new();
    config.register_providers(
        envelope_name("Envelope"),
        ObjectProviders::new(ElementProxyBuilder, ElementProxyMarshaller, EnvelopeUnmarshaller),
    );
    config.set_default_providers(Some(ElementProxy::providers()));
    config
}

#[test]
fn test_envelope_accepts_ordered_children() {
    let config = envelope_configuration();
    let document = Document::from_string(
        r#"<env:Envelope xmlns:env="urn:example:envelope">
               <env:Header/>
               <env:Body><payload xmlns="urn:example:payload">hello</payload></env:Body>
           </env:Envelope>"#,
    )
    .unwrap();

    let mut tree = ObjectTree::new();
    let root = config.unmarshall(&mut tree, document.root().unwrap()).unwrap();
    assert_eq!(tree.children(root).unwrap().len(), 2);
    assert_eq!(tree.len(), 4);

    tree.mark_dirty(root).unwrap();
    let element = config.marshall(&mut tree, root).unwrap();
    assert_xml_eq(&element, document.root().unwrap());
}

#[test]
fn test_envelope_rejects_misordered_children() {
    let config = envelope_configuration();
    let document = Document::from_string(
        r#"<env:Envelope xmlns:env="urn:example:envelope">
               <env:Body/>
               <env:Header/>
           </env:Envelope>"#,
    )
    .unwrap();

    let mut tree = ObjectTree::new();
    let err = config
        .unmarshall(&mut tree, document.root().unwrap())
        .unwrap_err();

    match err {
        Error::Unmarshalling(inner) => {
            assert!(inner.message.contains("Header"));
            assert_eq!(inner.path.as_deref(), Some("/env:Envelope"));
        }
        other => panic!("expected an unmarshalling error, got {}", other),
    }
    assert!(tree.is_empty());
}

// ============================================================================
// Signing
// ============================================================================

const SIGNATURE_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

struct AppendingSigner;

impl ElementSigner for AppendingSigner {
    fn sign(&self, element: &mut Element) -> Result<()> {
        element.append_child(Element::new(QName::prefixed(SIGNATURE_NS, "Signature", "ds")));
        Ok(())
    }
}

struct FailingSigner;

impl ElementSigner for FailingSigner {
    fn sign(&self, _element: &mut Element) -> Result<()> {
        Err(Error::Resource("signing key unavailable".to_string()))
    }
}

fn signatures(element: &Element) -> usize {
    element
        .child_elements()
        .filter(|e| e.qname() == &QName::namespaced(SIGNATURE_NS, "Signature"))
        .count()
}

fn signing_configuration(signer: Arc<dyn ElementSigner>) -> Configuration {
    let mut config = Configuration::new();
    let providers = SimpleXmlObject::providers();
    config.register_providers(
        SimpleXmlObject::element_name(),
        ObjectProviders {
            marshaller: Arc::new(SigningMarshaller::new(providers.marshaller.clone(), signer)),
            ..providers
        },
    );
    config
}

#[test]
fn test_signed_element_is_cached_once() {
    let config = signing_configuration(Arc::new(AppendingSigner));
    let mut tree = ObjectTree::new();
    let node = simple(&mut tree, Some("Firefly"));

    let element = config.marshall(&mut tree, node).unwrap();
    assert_eq!(signatures(&element), 1);
    assert!(tree.dom_cache(node).unwrap().is_fresh());

    let again = config.marshall(&mut tree, node).unwrap();
    assert_eq!(signatures(&again), 1);
}

#[test]
fn test_signing_failure_is_marshalling_error() {
    let config = signing_configuration(Arc::new(FailingSigner));
    let mut tree = ObjectTree::new();
    let root = simple(&mut tree, None);
    let child = simple(&mut tree, Some("child"));
    tree.children_mut(root).unwrap().add(child).unwrap();

    let err = config.marshall(&mut tree, root).unwrap_err();
    match err {
        Error::Marshalling(message) => assert!(message.contains("signing key unavailable")),
        other => panic!("expected a marshalling error, got {}", other),
    }
    assert!(matches!(tree.dom_cache(root).unwrap(), CacheLookup::Empty));
    assert!(matches!(tree.dom_cache(child).unwrap(), CacheLookup::Empty));
}
