//! Typed views over SRU response fragments.
//!
//! - [`Record`]: one record of a search result page
//! - [`Explain`]: the payload of an explain response
//! - [`EchoedRequest`]: the server's restatement of the request parameters

mod echo;
mod explain;
mod record;

pub use echo::{EchoedRequest, RecordXmlEscaping};
pub use explain::Explain;
pub use record::Record;

use crate::error::{Result, SruError};
use crate::xml::{convert, element_key, Element, Fragment, NamespacePolicy, StructuredValue};

/// Convert the payload wrapped by a `recordData` element.
///
/// The payload is the first child element. A `recordData` holding only text
/// carries its record as escaped XML, which is parsed first.
fn convert_record_data(
    record_data: &Element,
    policy: NamespacePolicy,
    context: &str,
) -> Result<(String, StructuredValue)> {
    if let Some(payload) = record_data.first_child() {
        return Ok((element_key(payload, policy), convert(payload, policy)));
    }

    match record_data.trimmed_text() {
        Some(escaped) => {
            let fragment = Fragment::parse(escaped)?;
            let payload = fragment.root();
            Ok((element_key(payload, policy), convert(payload, policy)))
        }
        None => Err(SruError::malformed("recordData child", context)),
    }
}

/// Trimmed text of a child element in the parent's namespace.
fn child_text(parent: &Element, local: &str) -> Option<String> {
    let namespace = parent.name().namespace().unwrap_or_default();
    parent
        .find_child(namespace, local)
        .and_then(Element::trimmed_text)
        .map(str::to_string)
}
