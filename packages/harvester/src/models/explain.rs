//! Explain responses.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::{convert_record_data, EchoedRequest};
use crate::error::{Result, SruError};
use crate::response::ResponseEnvelope;
use crate::xml::{find_descendant, find_qualified_child, Element, NamespacePolicy, StructuredValue};

/// The description a server gives of itself in answer to an explain request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explain {
    key: String,
    data: StructuredValue,
    raw: String,
    echo: Option<EchoedRequest>,
}

impl Explain {
    /// Read the explain payload from a response.
    ///
    /// SRU elements are looked up in the namespace of the document root, so
    /// 1.x and 2.0 responses are both accepted.
    pub fn from_response(response: &ResponseEnvelope, policy: NamespacePolicy) -> Result<Self> {
        let doc = response.xml()?;
        let root = doc.root_element();
        let namespace = root.tag_name().namespace().unwrap_or_default();

        let record_data = find_descendant(root, namespace, "recordData")
            .ok_or_else(|| SruError::malformed("recordData", "explain response"))?;
        let (key, data) = convert_record_data(
            &Element::from_node(record_data),
            policy,
            "explain response",
        )?;

        let echo = find_qualified_child(root, namespace, "echoedExplainRequest")
            .map(|node| EchoedRequest::from_element(&Element::from_node(node)));

        Ok(Self {
            key,
            data,
            raw: response.raw().to_string(),
            echo,
        })
    }

    /// Tag name of the payload root, usually `explain`.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Converted payload.
    pub fn data(&self) -> &StructuredValue {
        &self.data
    }

    /// The whole response body.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The server's echo of the explain request, if sent.
    pub fn echo(&self) -> Option<&EchoedRequest> {
        self.echo.as_ref()
    }
}

impl fmt::Display for Explain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Explain {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.data)?;
        map.end()
    }
}
