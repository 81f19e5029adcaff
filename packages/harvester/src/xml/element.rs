//! Owned XML element trees.
//!
//! `roxmltree` nodes borrow the document text. Records and explain data
//! outlive the response they came from, so they keep an owned copy of their
//! subtree instead.

use std::fmt;

use roxmltree::Node;

use super::mapper::NamespacePolicy;
use super::utils::{parse_document, recover_markup};
use crate::error::Result;

/// Namespace-qualified element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    namespace: Option<String>,
    local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.to_string(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    /// Whether this name has the given namespace and local name.
    ///
    /// An empty `namespace` matches names without a namespace.
    pub fn matches(&self, namespace: &str, local: &str) -> bool {
        self.local == local && self.namespace.as_deref().unwrap_or_default() == namespace
    }

    /// Key of this name under a namespace policy.
    ///
    /// # Examples
    /// ```
    /// use sru_harvester::xml::{NamespacePolicy, QName};
    ///
    /// let name = QName::new(Some("urn:x"), "title");
    /// assert_eq!(name.key(NamespacePolicy::Strip), "title");
    /// assert_eq!(name.key(NamespacePolicy::Preserve), "{urn:x}title");
    /// ```
    pub fn key(&self, policy: NamespacePolicy) -> String {
        match (policy, &self.namespace) {
            (NamespacePolicy::Preserve, Some(_)) => self.to_string(),
            _ => self.local.clone(),
        }
    }
}

impl fmt::Display for QName {
    /// Clark notation: `{namespace}local`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Owned copy of an XML element subtree.
///
/// Only the leading text of an element (the text before its first child)
/// is kept; text following a child element is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: QName,
    attributes: Vec<(QName, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    /// Copy an element node and all its descendants.
    pub fn from_node(node: Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        Self {
            name: QName::new(tag.namespace(), tag.name()),
            attributes: node
                .attributes()
                .map(|attr| (QName::new(attr.namespace(), attr.name()), attr.value().to_string()))
                .collect(),
            text: node.text().map(str::to_string),
            children: node
                .children()
                .filter(Node::is_element)
                .map(Self::from_node)
                .collect(),
        }
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    pub fn attributes(&self) -> &[(QName, String)] {
        &self.attributes
    }

    /// Value of the first attribute with the given local name.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name.local() == local)
            .map(|(_, value)| value.as_str())
    }

    /// Leading text, untrimmed.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Leading text, trimmed; `None` when absent or whitespace-only.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn first_child(&self) -> Option<&Element> {
        self.children.first()
    }

    /// First child with the given namespace and local name.
    pub fn find_child(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.children
            .iter()
            .find(|child| child.name.matches(namespace, local))
    }

    /// First descendant (document order, excluding `self`) with the given
    /// namespace and local name.
    pub fn find_descendant(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.children.iter().find_map(|child| {
            if child.name.matches(namespace, local) {
                Some(child)
            } else {
                child.find_descendant(namespace, local)
            }
        })
    }
}

/// An element subtree together with its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    root: Element,
    raw: String,
}

impl Fragment {
    /// Copy an element node, keeping the markup it was parsed from.
    ///
    /// Namespaces the element inherits from its ancestors are declared on
    /// the copied start tag, so `raw` parses on its own.
    pub fn from_node(node: Node<'_, '_>) -> Self {
        let markup = node
            .document()
            .input_text()
            .get(node.range())
            .unwrap_or_default();
        Self {
            root: Element::from_node(node),
            raw: declare_inherited_namespaces(node, markup),
        }
    }

    /// Parse a standalone XML document into a fragment rooted at its root
    /// element.
    ///
    /// Markup that does not parse is repaired with [`recover_markup`] and
    /// parsed again.
    pub fn parse(text: &str) -> Result<Self> {
        match parse_document(text) {
            Ok(doc) => Ok(Self::from_node(doc.root_element())),
            Err(err) => {
                let repaired = recover_markup(text).ok_or(err)?;
                let doc = parse_document(&repaired)?;
                Ok(Self::from_node(doc.root_element()))
            }
        }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Add `xmlns` declarations for the namespaces in scope at `node` that its
/// own start tag does not declare.
fn declare_inherited_namespaces(node: Node<'_, '_>, markup: &str) -> String {
    let start_tag = markup.find('>').map_or(markup, |end| &markup[..end]);
    let name_end = start_tag
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(start_tag.len());

    let declarations: String = node
        .namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .map(|ns| match ns.name() {
            Some(prefix) => (format!("xmlns:{prefix}"), ns.uri()),
            None => ("xmlns".to_string(), ns.uri()),
        })
        .filter(|(attr, _)| !declares(start_tag, attr))
        .map(|(attr, uri)| format!(" {attr}=\"{}\"", escape_attribute(uri)))
        .collect();

    if declarations.is_empty() {
        return markup.to_string();
    }
    let mut raw = String::with_capacity(markup.len() + declarations.len());
    raw.push_str(&markup[..name_end]);
    raw.push_str(&declarations);
    raw.push_str(&markup[name_end..]);
    raw
}

/// Whether a start tag carries the attribute `attr`.
fn declares(start_tag: &str, attr: &str) -> bool {
    start_tag.match_indices(attr).any(|(at, _)| {
        let before = start_tag[..at].chars().next_back();
        let after = start_tag[at + attr.len()..].trim_start();
        before.is_some_and(char::is_whitespace) && after.starts_with('=')
    })
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}
