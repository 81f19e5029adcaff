//! A single SRU record.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::{child_text, convert_record_data};
use crate::error::{Result, SruError};
use crate::xml::{Fragment, Mapping, NamespacePolicy, StructuredValue};

/// One record of a search result.
///
/// Holds the converted payload (the content of `recordData`) and the
/// verbatim markup of the `record` element it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    key: String,
    data: StructuredValue,
    raw: String,
    schema: Option<String>,
    escaping: Option<String>,
    position: Option<u32>,
    identifier: Option<String>,
}

impl Record {
    /// Build a record from a `record` element.
    ///
    /// `recordData` and the other record fields are looked up in the
    /// namespace of the `record` element.
    ///
    /// # Returns
    /// * `Err(SruError::MalformedResponse)` if `recordData` or its payload is missing
    pub fn from_fragment(fragment: &Fragment, policy: NamespacePolicy) -> Result<Self> {
        let root = fragment.root();
        let namespace = root.name().namespace().unwrap_or_default();
        let record_data = root
            .find_descendant(namespace, "recordData")
            .ok_or_else(|| SruError::malformed("recordData", "record"))?;

        let (key, data) = convert_record_data(record_data, policy, "record")?;

        Ok(Self {
            key,
            data,
            raw: fragment.raw().to_string(),
            schema: child_text(root, "recordSchema"),
            escaping: child_text(root, "recordXMLEscaping")
                .or_else(|| child_text(root, "recordPacking")),
            position: child_text(root, "recordPosition").and_then(|p| p.parse().ok()),
            identifier: child_text(root, "recordIdentifier"),
        })
    }

    /// Tag name of the payload root element.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Converted payload.
    pub fn data(&self) -> &StructuredValue {
        &self.data
    }

    /// Payload as a one-entry mapping `{key: data}`.
    pub fn to_mapping(&self) -> Mapping {
        let mut mapping = Mapping::new();
        mapping.insert(self.key.clone(), self.data.clone());
        mapping
    }

    /// The `record` markup as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Value of `recordSchema`.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Value of `recordXMLEscaping` (`recordPacking` in SRU 1.x).
    pub fn escaping(&self) -> Option<&str> {
        self.escaping.as_deref()
    }

    /// Value of `recordPosition`.
    pub fn position(&self) -> Option<u32> {
        self.position
    }

    /// Value of `recordIdentifier`.
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.data)?;
        map.end()
    }
}
