//! A response from an SRU server.

use std::sync::OnceLock;

use encoding_rs::Encoding;
use roxmltree::Document;
use tracing::warn;

use crate::error::Result;
use crate::http::{decode_body, HttpResponse};
use crate::types::RequestParameters;
use crate::xml::{parse_document, recover_markup};

/// One HTTP response together with the parameters that produced it.
///
/// The envelope is immutable. The XML tree is parsed anew on every call to
/// [`xml`](Self::xml); callers that need it repeatedly should keep the
/// returned document around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    params: RequestParameters,
    status: u16,
    url: String,
    text: String,
    repaired: OnceLock<Option<String>>,
}

impl ResponseEnvelope {
    /// Wrap a response, decoding its body to text.
    ///
    /// `encoding` overrides whatever encoding the response declares.
    pub fn new(
        response: HttpResponse,
        params: RequestParameters,
        encoding: Option<&'static Encoding>,
    ) -> Self {
        let text = decode_body(&response.body, response.content_type.as_deref(), encoding);
        Self {
            params,
            status: response.status,
            url: response.url,
            text,
            repaired: OnceLock::new(),
        }
    }

    /// Parameters of the request.
    pub fn params(&self) -> &RequestParameters {
        &self.params
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The response body as text.
    pub fn raw(&self) -> &str {
        &self.text
    }

    /// The response body as parsed XML.
    ///
    /// A body that is not well-formed is repaired with [`recover_markup`]
    /// and parsed again. Only when that fails too is the original parse
    /// error returned.
    pub fn xml(&self) -> Result<Document<'_>> {
        match parse_document(&self.text) {
            Ok(doc) => Ok(doc),
            Err(err) => match self.repaired() {
                Some(text) => parse_document(text),
                None => Err(err),
            },
        }
    }

    fn repaired(&self) -> Option<&str> {
        self.repaired
            .get_or_init(|| {
                let repaired = recover_markup(&self.text);
                if repaired.is_some() {
                    warn!(
                        url = %self.url,
                        "Response is not well-formed XML, parsing a repaired copy"
                    );
                }
                repaired
            })
            .as_deref()
    }
}
