//! Conversion of XML element trees into nested structured values.
//!
//! The rules are:
//!
//! - child elements become mapping entries keyed by tag name;
//! - a tag that occurs once under a parent holds a bare value, a tag that
//!   occurs two or more times holds a [`StructuredValue::Sequence`] in
//!   document order;
//! - attributes become entries keyed `@name`;
//! - an element with only text collapses to that text; text next to
//!   children or attributes is stored under `_text`;
//! - an element with no text, attributes or children is
//!   [`StructuredValue::Absent`].
//!
//! Because the shape of a key depends on how many siblings share its tag,
//! consumers must be prepared for either a bare value or a sequence under
//! any key. [`StructuredValue::one_or_many`] smooths this over.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::element::Element;

/// Key under which mixed leading text is stored.
pub const TEXT_KEY: &str = "_text";

/// Prefix of attribute keys.
pub const ATTRIBUTE_PREFIX: char = '@';

/// How namespaces appear in mapping keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamespacePolicy {
    /// Local names only (`title`).
    #[default]
    Strip,
    /// Clark notation for namespaced names (`{http://purl.org/dc/elements/1.1/}title`).
    Preserve,
}

/// Result of converting an XML element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StructuredValue {
    /// Empty element.
    #[default]
    Absent,
    /// Text-only element.
    Text(String),
    /// Repeated sibling elements, in document order.
    Sequence(Vec<StructuredValue>),
    /// Element with children or attributes.
    Mapping(Mapping),
}

impl StructuredValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[StructuredValue]> {
        match self {
            Self::Sequence(values) => Some(values),
            _ => None,
        }
    }

    /// Look up a key if this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&StructuredValue> {
        self.as_mapping().and_then(|mapping| mapping.get(key))
    }

    /// View a value as a list regardless of its shape.
    ///
    /// A sequence yields its items; any other value yields itself.
    ///
    /// # Examples
    /// ```
    /// use sru_harvester::xml::StructuredValue;
    ///
    /// let one = StructuredValue::Text("a".to_string());
    /// assert_eq!(one.one_or_many().len(), 1);
    ///
    /// let many = StructuredValue::Sequence(vec![one.clone(), one]);
    /// assert_eq!(many.one_or_many().len(), 2);
    /// ```
    pub fn one_or_many(&self) -> &[StructuredValue] {
        match self {
            Self::Sequence(values) => values,
            other => std::slice::from_ref(other),
        }
    }
}

impl Serialize for StructuredValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Sequence(values) => values.serialize(serializer),
            Self::Mapping(mapping) => mapping.serialize(serializer),
        }
    }
}

/// Insertion-ordered string-keyed map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mapping {
    entries: Vec<(String, StructuredValue)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing (in place) any value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: StructuredValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&StructuredValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StructuredValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Key of an element under a namespace policy.
pub fn element_key(element: &Element, policy: NamespacePolicy) -> String {
    element.name().key(policy)
}

/// Convert an element subtree into a structured value.
///
/// # Examples
/// ```
/// use sru_harvester::xml::{convert, Fragment, NamespacePolicy, StructuredValue};
///
/// let fragment = Fragment::parse("<title>Dune</title>").unwrap();
/// assert_eq!(
///     convert(fragment.root(), NamespacePolicy::Strip),
///     StructuredValue::Text("Dune".to_string())
/// );
/// ```
pub fn convert(element: &Element, policy: NamespacePolicy) -> StructuredValue {
    let text = element.trimmed_text();

    if element.children().is_empty() && element.attributes().is_empty() {
        return text.map_or(StructuredValue::Absent, |t| {
            StructuredValue::Text(t.to_string())
        });
    }

    // Group children by key, keeping first-appearance order of keys
    let mut groups: Vec<(String, Vec<StructuredValue>)> = Vec::new();
    for child in element.children() {
        let key = element_key(child, policy);
        let value = convert(child, policy);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => groups.push((key, vec![value])),
        }
    }

    let mut mapping = Mapping::new();
    for (key, mut values) in groups {
        let value = if values.len() == 1 {
            values.pop().unwrap_or_default()
        } else {
            StructuredValue::Sequence(values)
        };
        mapping.insert(key, value);
    }

    for (name, value) in element.attributes() {
        mapping.insert(
            format!("{ATTRIBUTE_PREFIX}{}", name.key(policy)),
            StructuredValue::Text(value.clone()),
        );
    }

    if let Some(text) = text {
        mapping.insert(TEXT_KEY, StructuredValue::Text(text.to_string()));
    }

    StructuredValue::Mapping(mapping)
}

/// Convert an element into a one-entry mapping `{key: value}`.
pub fn convert_keyed(element: &Element, policy: NamespacePolicy) -> Mapping {
    let mut mapping = Mapping::new();
    mapping.insert(element_key(element, policy), convert(element, policy));
    mapping
}
