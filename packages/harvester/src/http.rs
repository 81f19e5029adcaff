//! HTTP transport for SRU requests.
//!
//! The [`Transport`] trait is the seam between the harvesting logic and the
//! network. [`ReqwestTransport`] is the production implementation.

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use tracing::warn;
use url::{form_urlencoded, Url};

use crate::config::HttpMethod;
use crate::error::Result;

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("sru-harvester/", env!("CARGO_PKG_VERSION"));

/// A single outgoing SRU request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub params: Vec<(String, String)>,
}

impl HttpRequest {
    /// Value of a request parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// What the harvester needs from an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw `Retry-After` header value, if sent.
    pub retry_after: Option<String>,
    /// Raw `Content-Type` header value, if sent.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
    /// Final URL after redirects.
    pub url: String,
}

impl HttpResponse {
    /// Whether the status is 400 or above.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Sends SRU requests over HTTP.
///
/// Implementations report connection-level failures as errors and return
/// every received response, whatever its status.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Create a configured HTTP client.
///
/// # Returns
/// A `reqwest::blocking::Client` configured with the given timeout and user agent.
pub fn create_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// [`Transport`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(create_client(timeout)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let builder = match request.method {
            HttpMethod::Get => {
                let mut url = request.url.clone();
                if !request.params.is_empty() {
                    url.query_pairs_mut().extend_pairs(&request.params);
                }
                self.client.get(url)
            }
            HttpMethod::Post => self
                .client
                .post(request.url.clone())
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encode_form(&request.params)),
        };

        let response = builder.send()?;
        let status = response.status().as_u16();
        let header = |name| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let retry_after = header(RETRY_AFTER);
        let content_type = header(CONTENT_TYPE);
        let url = response.url().to_string();
        let body = response.bytes()?.to_vec();

        Ok(HttpResponse {
            status,
            retry_after,
            content_type,
            body,
            url,
        })
    }
}

/// Encode parameters as an `application/x-www-form-urlencoded` body.
///
/// # Examples
/// ```
/// use sru_harvester::http::encode_form;
///
/// let params = vec![("query".to_string(), "dc.title = \"dune\"".to_string())];
/// assert_eq!(encode_form(&params), "query=dc.title+%3D+%22dune%22");
/// ```
pub fn encode_form(params: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

/// Parse a `Retry-After` header holding a number of seconds.
///
/// HTTP-date values and anything else that is not a plain non-negative
/// integer yield `None`.
pub fn parse_retry_after(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

/// Decode a response body to text.
///
/// The encoding is, in order of precedence: `forced`, a byte order mark,
/// the `encoding` of the XML declaration, the `charset` of the
/// `Content-Type` header, and finally UTF-8. Bytes that are invalid in
/// the chosen encoding are replaced with U+FFFD.
///
/// # Examples
/// ```
/// use sru_harvester::http::decode_body;
///
/// let body = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><t>caf\xe9</t>";
/// assert!(decode_body(body, None, None).ends_with("<t>caf\u{e9}</t>"));
/// ```
pub fn decode_body(
    body: &[u8],
    content_type: Option<&str>,
    forced: Option<&'static Encoding>,
) -> String {
    let (text, encoding, had_errors) = match forced {
        Some(encoding) => {
            let (text, had_errors) = encoding.decode_with_bom_removal(body);
            (text, encoding, had_errors)
        }
        None => {
            let encoding = declared_encoding(body)
                .or_else(|| content_type.and_then(charset))
                .unwrap_or(UTF_8);
            encoding.decode(body)
        }
    };
    if had_errors {
        warn!(
            encoding = encoding.name(),
            "Response holds bytes that are invalid in its encoding, replacing them"
        );
    }
    text.into_owned()
}

/// Encoding named by the XML declaration at the start of `body`.
fn declared_encoding(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(256)];
    let start = head.iter().position(|b| !b.is_ascii_whitespace())?;
    let head = head[start..].strip_prefix(b"<?xml")?;
    let end = head.windows(2).position(|w| w == b"?>")?;
    let declaration = std::str::from_utf8(&head[..end]).ok()?;

    let (_, rest) = declaration.split_once("encoding")?;
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let (label, _) = rest[1..].split_once(quote)?;
    Encoding::for_label(label.as_bytes()).map(Encoding::output_encoding)
}

/// Encoding named by the `charset` parameter of a `Content-Type` value.
fn charset(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
        .map(Encoding::output_encoding)
}
