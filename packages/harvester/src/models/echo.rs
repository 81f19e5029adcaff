//! Echoed request parameters.

use serde::Serialize;

use super::child_text;
use crate::xml::{convert, Element, NamespacePolicy, StructuredValue};

/// How records are embedded in `recordData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordXmlEscaping {
    /// Records are embedded as XML.
    Xml,
    /// Records are embedded as escaped text.
    String,
}

impl RecordXmlEscaping {
    /// Parse the wire value; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "xml" => Some(Self::Xml),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// The server's echo of a searchRetrieve or explain request.
///
/// Every field is `None` when the element is missing or its text does not
/// convert to the field's type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoedRequest {
    /// The whole echo element, namespaces stripped.
    #[serde(skip)]
    pub data: StructuredValue,
    pub version: Option<String>,
    pub query: Option<String>,
    pub start_record: Option<u32>,
    pub maximum_records: Option<u32>,
    #[serde(rename = "recordXMLEscaping")]
    pub record_xml_escaping: Option<RecordXmlEscaping>,
    pub record_schema: Option<String>,
    pub base_url: Option<String>,
    #[serde(rename = "xQuery")]
    pub x_query: Option<String>,
}

impl EchoedRequest {
    /// Read an `echoedSearchRetrieveRequest` or `echoedExplainRequest`
    /// element. Children are looked up in the element's own namespace.
    pub fn from_element(element: &Element) -> Self {
        let text = |local: &str| child_text(element, local);
        let number = |local: &str| text(local).and_then(|t| t.parse::<u32>().ok());

        Self {
            data: convert(element, NamespacePolicy::Strip),
            version: text("version"),
            query: text("query"),
            start_record: number("startRecord"),
            maximum_records: number("maximumRecords"),
            // SRU 1.x calls this recordPacking
            record_xml_escaping: text("recordXMLEscaping")
                .or_else(|| text("recordPacking"))
                .as_deref()
                .and_then(RecordXmlEscaping::parse),
            record_schema: text("recordSchema"),
            base_url: text("baseUrl"),
            x_query: text("xQuery"),
        }
    }
}
