//! XML document model
//!
//! An owned DOM used on both sides of the marshalling boundary. Documents are
//! parsed with `roxmltree` (namespaces fully resolved) and written with
//! `quick-xml`, which fixes up namespace declarations so that any element,
//! including one cut out of a larger tree, serializes on its own.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::{Namespace, NamespaceContext, QName};
use indexmap::{IndexMap, IndexSet};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// An attribute on an [`Element`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name
    pub name: QName,
    /// Attribute value
    pub value: String,
    /// Whether the DOM treats this attribute as an XML ID
    pub is_id: bool,
}

impl Attribute {
    /// Create a plain attribute
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            is_id: false,
        }
    }

    /// Create an attribute flagged as an XML ID
    pub fn id(name: QName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            is_id: true,
        }
    }
}

/// Child content of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Nested element
    Element(Element),
    /// Character data
    Text(String),
}

/// XML Element in the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Element qualified name
    qname: QName,
    /// Element attributes, in document order
    attributes: IndexMap<QName, Attribute>,
    /// Namespace declarations made on this element
    namespaces: Vec<Namespace>,
    /// Child elements and text
    children: Vec<Content>,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            attributes: IndexMap::new(),
            namespaces: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element qualified name
    pub fn qname(&self) -> &QName {
        &self.qname
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Get an attribute by qualified name
    pub fn attribute(&self, name: &QName) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Get an attribute value by qualified name
    pub fn attribute_value(&self, name: &QName) -> Option<&str> {
        self.attributes.get(name).map(|a| a.value.as_str())
    }

    /// Iterate over attributes in document order
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Number of attributes
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Attributes flagged as XML IDs
    pub fn id_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values().filter(|a| a.is_id)
    }

    /// Set an attribute, replacing any attribute with the same name
    pub fn set_attribute(&mut self, attribute: Attribute) -> Option<Attribute> {
        self.attributes.insert(attribute.name.clone(), attribute)
    }

    /// Flag (or unflag) an existing attribute as an XML ID
    pub fn set_id_attribute(&mut self, name: &QName, is_id: bool) -> bool {
        match self.attributes.get_mut(name) {
            Some(attr) => {
                attr.is_id = is_id;
                true
            }
            None => false,
        }
    }

    /// Remove an attribute
    pub fn remove_attribute(&mut self, name: &QName) -> Option<Attribute> {
        self.attributes.shift_remove(name)
    }

    /// Namespace declarations made on this element
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// Declare a namespace on this element, replacing a declaration of the same prefix
    pub fn declare_namespace(&mut self, namespace: Namespace) {
        match self
            .namespaces
            .iter_mut()
            .find(|ns| ns.prefix == namespace.prefix)
        {
            Some(existing) => *existing = namespace,
            None => self.namespaces.push(namespace),
        }
    }

    /// Child content
    pub fn children(&self) -> &[Content] {
        &self.children
    }

    /// Child elements only
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Content::Element(e) => Some(e),
            Content::Text(_) => None,
        })
    }

    /// Add a child element
    pub fn append_child(&mut self, child: Element) {
        self.children.push(Content::Element(child));
    }

    /// Append text, merging with a trailing text node
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.children.last_mut() {
            Some(Content::Text(existing)) => existing.push_str(text),
            _ => self.children.push(Content::Text(text.to_string())),
        }
    }

    /// Concatenated direct text content, None if the element has no text
    pub fn text(&self) -> Option<String> {
        let mut text: Option<String> = None;
        for child in &self.children {
            if let Content::Text(t) = child {
                text.get_or_insert_with(String::new).push_str(t);
            }
        }
        text
    }

    /// Structural XML equality.
    ///
    /// Compares expanded names, attribute sets, and element children in
    /// order. Prefixes, namespace declaration placement, ID flags and
    /// whitespace-only text are not significant; other text is compared
    /// trimmed.
    pub fn xml_eq(&self, other: &Element) -> bool {
        if self.qname != other.qname || self.attributes.len() != other.attributes.len() {
            return false;
        }

        let attributes_match = self.attributes.iter().all(|(name, attr)| {
            other
                .attributes
                .get(name)
                .map_or(false, |o| o.value == attr.value)
        });
        if !attributes_match {
            return false;
        }

        let ours = self.significant_children();
        let theirs = other.significant_children();
        ours.len() == theirs.len()
            && ours.iter().zip(theirs.iter()).all(|pair| match pair {
                (Significant::Text(a), Significant::Text(b)) => a == b,
                (Significant::Element(a), Significant::Element(b)) => a.xml_eq(b),
                _ => false,
            })
    }

    fn significant_children(&self) -> Vec<Significant<'_>> {
        let mut out = Vec::new();
        let mut pending = String::new();
        for child in &self.children {
            match child {
                Content::Text(t) => pending.push_str(t),
                Content::Element(e) => {
                    flush_text(&mut pending, &mut out);
                    out.push(Significant::Element(e));
                }
            }
        }
        flush_text(&mut pending, &mut out);
        out
    }

    /// Serialize this element as a standalone document
    pub fn to_xml_string(&self) -> Result<String> {
        write_document(Some(self), false)
    }
}

enum Significant<'a> {
    Text(String),
    Element(&'a Element),
}

fn flush_text<'a>(pending: &mut String, out: &mut Vec<Significant<'a>>) {
    let trimmed = pending.trim();
    if !trimmed.is_empty() {
        out.push(Significant::Text(trimmed.to_string()));
    }
    pending.clear();
}

/// Options controlling document parsing
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Resource limits
    pub limits: Limits,
    /// Attribute names flagged as XML IDs while parsing
    pub id_attributes: IndexSet<QName>,
}

impl ParseOptions {
    /// Default options: default limits, `xml:id` flagged as ID
    pub fn new() -> Self {
        let mut id_attributes = IndexSet::new();
        id_attributes.insert(QName::prefixed(crate::XML_NAMESPACE, "id", "xml"));
        Self {
            limits: Limits::default(),
            id_attributes,
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Flag another attribute name as an XML ID
    pub fn with_id_attribute(mut self, name: QName) -> Self {
        self.id_attributes.insert(name);
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// XML Document representation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Root element of the document
    root: Option<Element>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Create a document with a root element
    pub fn with_root(root: Element) -> Self {
        Self { root: Some(root) }
    }

    /// Parse an XML document from a string with default options
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse_with(xml, &ParseOptions::default())
    }

    /// Parse an XML document from bytes with default options
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(xml)
            .map_err(|e| Error::Xml(format!("Invalid UTF-8 in document: {}", e)))?;
        Self::from_string(text)
    }

    /// Parse an XML document from a string
    pub fn parse_with(xml: &str, options: &ParseOptions) -> Result<Self> {
        options.limits.check_document_size(xml.len())?;

        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| Error::Xml(format!("Error parsing XML: {}", e)))?;

        let root = convert_element(doc.root_element(), options, 1)?;
        Ok(Self { root: Some(root) })
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// Get the root element mutably
    pub fn root_mut(&mut self) -> Option<&mut Element> {
        self.root.as_mut()
    }

    /// Replace the root element, returning the previous one
    pub fn set_root(&mut self, root: Element) -> Option<Element> {
        self.root.replace(root)
    }

    /// Take the root element out of the document
    pub fn into_root(self) -> Option<Element> {
        self.root
    }

    /// Serialize the document
    pub fn to_xml_string(&self) -> Result<String> {
        write_document(self.root.as_ref(), false)
    }

    /// Serialize the document with indentation
    pub fn to_pretty_string(&self) -> Result<String> {
        write_document(self.root.as_ref(), true)
    }
}

fn convert_element(
    node: roxmltree::Node<'_, '_>,
    options: &ParseOptions,
    depth: usize,
) -> Result<Element> {
    options.limits.check_depth(depth)?;

    let tag = node.tag_name();
    let prefix = tag.namespace().and_then(|ns| prefix_in_scope(node, ns));
    let qname = QName::new(tag.namespace(), tag.name()).with_prefix(prefix);
    let mut element = Element::new(qname);

    // roxmltree reports every in-scope namespace; keep only what this element adds
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    for ns in node.namespaces() {
        if ns.name() == Some("xml") || inherited.contains(&(ns.name(), ns.uri())) {
            continue;
        }
        element.declare_namespace(Namespace::new(ns.name(), ns.uri()));
    }

    options.limits.check_attributes(node.attributes().count())?;
    for attr in node.attributes() {
        let prefix = attr.namespace().and_then(|ns| {
            if ns == crate::XML_NAMESPACE {
                Some("xml")
            } else {
                prefix_in_scope(node, ns)
            }
        });
        let name = QName::new(attr.namespace(), attr.name()).with_prefix(prefix);
        let is_id = options.id_attributes.contains(&name);
        element.set_attribute(Attribute {
            name,
            value: attr.value().to_string(),
            is_id,
        });
    }

    let mut child_count = 0;
    for child in node.children() {
        if child.is_element() {
            child_count += 1;
            options.limits.check_children(child_count)?;
            element.append_child(convert_element(child, options, depth + 1)?);
        } else if child.is_text() {
            element.push_text(child.text().unwrap_or_default());
        }
    }

    Ok(element)
}

fn prefix_in_scope<'a>(node: roxmltree::Node<'a, '_>, namespace: &str) -> Option<&'a str> {
    node.namespaces()
        .find(|ns| ns.uri() == namespace && ns.name().is_some())
        .and_then(|ns| ns.name())
}

fn xml_error(e: impl std::fmt::Display) -> Error {
    Error::Xml(format!("Error writing XML: {}", e))
}

fn write_document(root: Option<&Element>, indent: bool) -> Result<String> {
    let mut writer = if indent {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;

    if let Some(root) = root {
        let mut generated = 0;
        write_element(&mut writer, root, &NamespaceContext::new(), &mut generated)?;
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Xml(format!("Serialized XML is not UTF-8: {}", e)))
}

/// Record `namespace` in the declarations of the element being written
fn bind(scope: &mut NamespaceContext, declarations: &mut Vec<Namespace>, namespace: Namespace) {
    scope.declare(&namespace);
    match declarations
        .iter_mut()
        .find(|ns| ns.prefix == namespace.prefix)
    {
        Some(existing) => *existing = namespace,
        None => declarations.push(namespace),
    }
}

fn is_bound(scope: &NamespaceContext, prefix: Option<&str>, uri: &str) -> bool {
    match prefix {
        Some(p) => scope.get_namespace(p) == Some(uri),
        None => scope.get_default_namespace().unwrap_or("") == uri,
    }
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &Element,
    parent_scope: &NamespaceContext,
    generated: &mut usize,
) -> Result<()> {
    let mut scope = parent_scope.clone();
    let mut declarations: Vec<Namespace> = Vec::new();

    for ns in element.namespaces() {
        if ns.prefix.as_deref() == Some("xml") || is_bound(&scope, ns.prefix.as_deref(), &ns.uri) {
            continue;
        }
        bind(&mut scope, &mut declarations, ns.clone());
    }

    let qname = element.qname();
    let prefix = qname.prefix.as_deref().filter(|p| !p.is_empty());
    let uri = qname.namespace().unwrap_or("");
    let element_prefix = match (qname.namespace(), prefix) {
        (Some(_), Some(p)) if p == "xml" => Some(p.to_string()),
        (Some(_), Some(p)) => {
            if !is_bound(&scope, Some(p), uri) {
                bind(&mut scope, &mut declarations, Namespace::new(Some(p), uri));
            }
            Some(p.to_string())
        }
        _ => {
            if !is_bound(&scope, None, uri) {
                bind(&mut scope, &mut declarations, Namespace::new(None::<String>, uri));
            }
            None
        }
    };
    let name = match &element_prefix {
        Some(p) => format!("{}:{}", p, qname.local_name),
        None => qname.local_name.clone(),
    };

    let mut attributes: Vec<(String, &str)> = Vec::with_capacity(element.attribute_count());
    for attr in element.attributes() {
        let attr_name = match attr.name.namespace() {
            None => attr.name.local_name.clone(),
            Some(ns) => {
                let attr_prefix =
                    attribute_prefix(&mut scope, &mut declarations, &attr.name, ns, generated);
                format!("{}:{}", attr_prefix, attr.name.local_name)
            }
        };
        attributes.push((attr_name, attr.value.as_str()));
    }

    let mut start = BytesStart::new(name.as_str());
    for ns in &declarations {
        let key = match &ns.prefix {
            Some(p) => format!("xmlns:{}", p),
            None => "xmlns".to_string(),
        };
        start.push_attribute((key.as_str(), ns.uri.as_str()));
    }
    for (key, value) in &attributes {
        start.push_attribute((key.as_str(), *value));
    }

    if element.children().is_empty() {
        writer.write_event(Event::Empty(start)).map_err(xml_error)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    for child in element.children() {
        match child {
            Content::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_error)?,
            Content::Element(child) => write_element(writer, child, &scope, generated)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(name.as_str())))
        .map_err(xml_error)?;
    Ok(())
}

/// Pick (and if needed declare) a non-empty prefix for a namespaced attribute
fn attribute_prefix(
    scope: &mut NamespaceContext,
    declarations: &mut Vec<Namespace>,
    name: &QName,
    namespace: &str,
    generated: &mut usize,
) -> String {
    if namespace == crate::XML_NAMESPACE {
        return "xml".to_string();
    }

    let preferred = name.prefix.as_deref().filter(|p| !p.is_empty());
    if let Some(p) = preferred {
        if scope.get_namespace(p) == Some(namespace) {
            return p.to_string();
        }
    }
    if let Some(p) = scope.prefix_for(namespace) {
        return p.to_string();
    }

    let declared_here = |p: &str| declarations.iter().any(|ns| ns.prefix.as_deref() == Some(p));
    let chosen = match preferred {
        Some(p) if !declared_here(p) => p.to_string(),
        _ => loop {
            *generated += 1;
            let candidate = format!("ns{}", generated);
            if scope.get_namespace(&candidate).is_none() {
                break candidate;
            }
        },
    };
    bind(scope, declarations, Namespace::new(Some(chosen.clone()), namespace));
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_creation() {
        let doc = Document::new();
        assert!(doc.root().is_none());
    }

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.child_elements().count(), 1);
        let child = root.child_elements().next().unwrap();
        assert_eq!(child.local_name(), "child");
        assert_eq!(child.text().as_deref(), Some("text"));
    }

    #[test]
    fn test_parse_with_attributes() {
        let xml = r#"<root attr1="value1" attr2="value2"><child/></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.attribute_value(&QName::local("attr1")), Some("value1"));
        assert_eq!(root.attribute_value(&QName::local("attr2")), Some("value2"));
        assert_eq!(root.attribute_count(), 2);
    }

    #[test]
    fn test_parse_with_namespaces() {
        let xml = r#"<t:root xmlns:t="urn:test" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><t:child/></t:root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root().unwrap();
        assert_eq!(root.namespace(), Some("urn:test"));
        assert_eq!(root.qname().prefix.as_deref(), Some("t"));
        assert_eq!(root.namespaces().len(), 2);

        // inherited declarations are not repeated on children
        let child = root.child_elements().next().unwrap();
        assert!(child.namespaces().is_empty());
        assert_eq!(child.namespace(), Some("urn:test"));
    }

    #[test]
    fn test_xml_id_is_flagged() {
        let xml = r#"<root><a xml:id="one"/><b id="two"/></root>"#;
        let doc = Document::from_string(xml).unwrap();
        let root = doc.root().unwrap();

        let flagged = |root: &Element| -> Vec<String> {
            root.child_elements()
                .flat_map(|e| e.id_attributes().map(|a| a.value.clone()))
                .collect()
        };
        assert_eq!(flagged(root), vec!["one".to_string()]);

        let options = ParseOptions::new().with_id_attribute(QName::local("id"));
        let doc = Document::parse_with(xml, &options).unwrap();
        assert_eq!(flagged(doc.root().unwrap()), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_depth_limit() {
        let xml = "<a><b><c><d/></c></b></a>";
        let options = ParseOptions::new().with_limits(Limits {
            max_depth: 3,
            ..Limits::default()
        });
        let result = Document::parse_with(xml, &options);
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            Document::from_string("<root><open></root>"),
            Err(Error::Xml(_))
        ));
    }

    #[test]
    fn test_write_declares_namespaces() {
        let mut root = Element::new(QName::prefixed("urn:test", "root", "t"));
        let mut child = Element::new(QName::prefixed("urn:test", "child", "t"));
        child.set_attribute(Attribute::new(QName::namespaced("urn:other", "flag"), "yes"));
        child.push_text("hello");
        root.append_child(child);

        let xml = root.to_xml_string().unwrap();
        assert!(xml.contains(r#"<t:root xmlns:t="urn:test">"#));
        assert!(xml.contains(r#"xmlns:ns1="urn:other""#));
        assert!(xml.contains(r#"ns1:flag="yes""#));

        let reparsed = Document::from_string(&xml).unwrap();
        assert!(reparsed.root().unwrap().xml_eq(&root));
    }

    #[test]
    fn test_write_escapes_text_and_attributes() {
        let mut root = Element::new(QName::local("root"));
        root.set_attribute(Attribute::new(QName::local("q"), "a\"b<c"));
        root.push_text("1 < 2 & 3");

        let xml = root.to_xml_string().unwrap();
        let reparsed = Document::from_string(&xml).unwrap();
        let reparsed = reparsed.root().unwrap();
        assert_eq!(reparsed.attribute_value(&QName::local("q")), Some("a\"b<c"));
        assert_eq!(reparsed.text().as_deref(), Some("1 < 2 & 3"));
    }

    #[test]
    fn test_unprefixed_child_of_default_namespace_is_undeclared() {
        let mut root = Element::new(QName::namespaced("urn:test", "root"));
        root.append_child(Element::new(QName::local("plain")));

        let xml = root.to_xml_string().unwrap();
        assert!(xml.contains(r#"<plain xmlns=""/>"#));

        let reparsed = Document::from_string(&xml).unwrap();
        let plain = reparsed.root().unwrap().child_elements().next().unwrap();
        assert_eq!(plain.namespace(), None);
    }

    #[test]
    fn test_xml_eq_ignores_prefixes_and_whitespace() {
        let a = Document::from_string(r#"<a:root xmlns:a="urn:x" k="v"><a:c>text</a:c></a:root>"#).unwrap();
        let b = Document::from_string("<root xmlns=\"urn:x\" k=\"v\">\n  <c> text </c>\n</root>").unwrap();
        assert!(a.root().unwrap().xml_eq(b.root().unwrap()));

        let c = Document::from_string(r#"<root xmlns="urn:x" k="w"><c>text</c></root>"#).unwrap();
        assert!(!a.root().unwrap().xml_eq(c.root().unwrap()));
    }

    #[test]
    fn test_element_creation() {
        let qname = QName::local("test");
        let mut elem = Element::new(qname);
        elem.push_text("con");
        elem.push_text("tent");

        assert_eq!(elem.local_name(), "test");
        assert_eq!(elem.children().len(), 1);
        assert_eq!(elem.text().as_deref(), Some("content"));
    }
}
