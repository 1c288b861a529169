//! Configuration document parsing
//!
//! ```xml
//! <XMLTooling xmlns="http://www.opensaml.org/xmltooling-config">
//!   <ObjectProviders>
//!     <ObjectProvider qualifiedName="test:SimpleElement">
//!       <BuilderClass className="SimpleXmlObjectBuilder"/>
//!       <MarshallingClass className="SimpleXmlObjectMarshaller"/>
//!       <UnmarshallingClass className="SimpleXmlObjectUnmarshaller"/>
//!     </ObjectProvider>
//!   </ObjectProviders>
//!   <IDAttributes>
//!     <IDAttribute>test:identifier</IDAttribute>
//!   </IDAttributes>
//! </XMLTooling>
//! ```
//!
//! Everything is resolved into a [`StagedConfiguration`] first; nothing
//! reaches a registry unless the whole document resolved.

use super::catalog::ComponentCatalog;
use super::ObjectProviders;
use crate::documents::{Document, Element};
use crate::error::{ConfigurationError, Error, Result};
use crate::names::validate_qname;
use crate::namespaces::{NamespaceContext, QName};

/// Namespace of configuration documents
pub const CONFIG_NAMESPACE: &str = "http://www.opensaml.org/xmltooling-config";

/// Qualified name under which the default providers are registered
pub fn default_provider_name() -> QName {
    QName::namespaced(CONFIG_NAMESPACE, "DEFAULT")
}

/// A fully resolved configuration document
#[derive(Debug, Default)]
pub(crate) struct StagedConfiguration {
    pub(crate) providers: Vec<(QName, ObjectProviders)>,
    pub(crate) default_providers: Option<ObjectProviders>,
    pub(crate) id_attributes: Vec<QName>,
}

fn config_error(message: impl Into<String>, element: &Element) -> Error {
    let source = element
        .to_xml_string()
        .map(|xml| strip_declaration(&xml).to_string())
        .unwrap_or_else(|_| element.qname().prefixed_name());
    ConfigurationError::new(message).with_source(source).into()
}

fn strip_declaration(xml: &str) -> &str {
    match xml.find("?>") {
        Some(end) if xml.starts_with("<?xml") => &xml[end + 2..],
        _ => xml,
    }
}

fn is_config_element(element: &Element, local_name: &str) -> bool {
    element.namespace() == Some(CONFIG_NAMESPACE) && element.local_name() == local_name
}

fn resolve_name(lexical: &str, scope: &NamespaceContext, element: &Element) -> Result<QName> {
    let lexical = lexical.trim();
    validate_qname(lexical)
        .and_then(|_| scope.resolve(lexical))
        .map_err(|e| config_error(format!("cannot resolve name '{}': {}", lexical, e), element))
}

pub(crate) fn parse_configuration(
    document: &Document,
    catalog: &ComponentCatalog,
) -> Result<StagedConfiguration> {
    let root = document
        .root()
        .ok_or_else(|| Error::from(ConfigurationError::new("configuration document is empty")))?;
    if !is_config_element(root, "XMLTooling") {
        return Err(config_error(
            format!(
                "configuration root must be {{{}}}XMLTooling, found {}",
                CONFIG_NAMESPACE,
                root.qname()
            ),
            &Element::new(root.qname().clone()),
        ));
    }

    let scope = NamespaceContext::new().with_declarations(root.namespaces());
    let mut staged = StagedConfiguration::default();

    for section in root.child_elements() {
        let section_scope = scope.with_declarations(section.namespaces());
        if is_config_element(section, "ObjectProviders") {
            for provider in section.child_elements() {
                let provider_scope = section_scope.with_declarations(provider.namespaces());
                let (name, providers) = parse_provider(provider, &provider_scope, catalog)?;
                if name == default_provider_name() {
                    staged.default_providers = Some(providers);
                } else {
                    staged.providers.push((name, providers));
                }
            }
        } else if is_config_element(section, "IDAttributes") {
            for id_attribute in section.child_elements() {
                if !is_config_element(id_attribute, "IDAttribute") {
                    return Err(config_error("expected IDAttribute", id_attribute));
                }
                let id_scope = section_scope.with_declarations(id_attribute.namespaces());
                let text = id_attribute.text().unwrap_or_default();
                staged
                    .id_attributes
                    .push(resolve_name(&text, &id_scope, id_attribute)?);
            }
        } else {
            return Err(config_error(
                format!("unexpected configuration element {}", section.qname()),
                section,
            ));
        }
    }

    Ok(staged)
}

fn parse_provider(
    provider: &Element,
    scope: &NamespaceContext,
    catalog: &ComponentCatalog,
) -> Result<(QName, ObjectProviders)> {
    if !is_config_element(provider, "ObjectProvider") {
        return Err(config_error("expected ObjectProvider", provider));
    }

    let lexical = provider
        .attribute_value(&QName::local("qualifiedName"))
        .ok_or_else(|| config_error("ObjectProvider is missing qualifiedName", provider))?;
    let name = resolve_name(lexical, scope, provider)?;

    let class_name = |local_name: &str| -> Result<String> {
        let class = provider
            .child_elements()
            .find(|e| is_config_element(e, local_name))
            .ok_or_else(|| config_error(format!("ObjectProvider {} is missing {}", name, local_name), provider))?;
        class
            .attribute_value(&QName::local("className"))
            .map(|c| c.trim().to_string())
            .ok_or_else(|| config_error(format!("{} is missing className", local_name), class))
    };

    let with_source = |err: Error| match err {
        Error::Configuration(inner) if inner.source.is_none() => {
            config_error(inner.message, provider)
        }
        other => other,
    };

    let providers = ObjectProviders {
        builder: catalog
            .builder(&class_name("BuilderClass")?)
            .map_err(with_source)?,
        marshaller: catalog
            .marshaller(&class_name("MarshallingClass")?)
            .map_err(with_source)?,
        unmarshaller: catalog
            .unmarshaller(&class_name("UnmarshallingClass")?)
            .map_err(with_source)?,
    };
    Ok((name, providers))
}
