//! Request execution: one SRU round trip with retries and error detection.

use std::sync::Arc;
use std::time::Duration;

use encoding_rs::Encoding;
use roxmltree::Document;
use tracing::{debug, warn};
use url::Url;

use crate::config::{ClientConfig, HttpMethod, SruVersion};
use crate::error::{ProtocolError, Result, SruError};
use crate::http::{parse_retry_after, HttpRequest, Transport};
use crate::response::ResponseEnvelope;
use crate::types::RequestParameters;
use crate::xml::{get_text, has_qualified_tag};

/// Function used to wait between retries.
pub type SleepFn = Arc<dyn Fn(Duration) + Send + Sync>;

/// Code reported when an `error` element has no `code` attribute.
const UNKNOWN_ERROR_CODE: &str = "UNKNOWN";

/// Sends SRU requests and turns the responses into [`ResponseEnvelope`]s.
///
/// A request is retried while the server answers with one of the
/// configured retryable statuses, up to `max_retries` times. Failures
/// reported inside a response document are raised as
/// [`SruError::Protocol`] even when the HTTP status is 200.
pub struct Harvester {
    endpoint: Url,
    method: HttpMethod,
    version: SruVersion,
    max_retries: u32,
    retry_status_codes: Vec<u16>,
    default_retry_after: Duration,
    encoding: Option<&'static Encoding>,
    transport: Box<dyn Transport>,
    sleep: SleepFn,
}

impl Harvester {
    /// Create a harvester for a validated configuration.
    pub fn new(config: &ClientConfig, transport: Box<dyn Transport>) -> Result<Self> {
        let endpoint = config.validate()?;
        let encoding = config.forced_encoding()?;
        let sleep: SleepFn = Arc::new(std::thread::sleep);
        Ok(Self {
            endpoint,
            method: config.http_method,
            version: config.version,
            max_retries: config.max_retries,
            retry_status_codes: config.retry_status_codes.clone(),
            default_retry_after: config.default_retry_after,
            encoding,
            transport,
            sleep,
        })
    }

    /// Replace the function used to wait between retries.
    #[must_use]
    pub fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn version(&self) -> SruVersion {
        self.version
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Perform one SRU request.
    ///
    /// # Returns
    /// * `Err(SruError::Transport)` / `Err(SruError::Connection)` if no response was received
    /// * `Err(SruError::HttpStatus)` if the final status is 400 or above
    /// * `Err(SruError::XmlParse)` if the body is not XML
    /// * `Err(SruError::Protocol)` if the document reports an error
    pub fn fetch(&self, params: &RequestParameters) -> Result<ResponseEnvelope> {
        let request = HttpRequest {
            method: self.method,
            url: self.endpoint.clone(),
            params: params.as_pairs().to_vec(),
        };

        debug!(
            method = %self.method,
            url = %self.endpoint,
            start_record = params.get("startRecord"),
            "Sending SRU request"
        );
        let mut response = self.transport.send(&request)?;

        for attempt in 1..=self.max_retries {
            if !(response.is_error() && self.retry_status_codes.contains(&response.status)) {
                continue;
            }
            let delay = parse_retry_after(response.retry_after.as_deref())
                .map_or(self.default_retry_after, Duration::from_secs);
            warn!(
                status = response.status,
                delay_secs = delay.as_secs(),
                attempt,
                max_retries = self.max_retries,
                "Server asked to retry later"
            );
            (self.sleep)(delay);
            response = self.transport.send(&request)?;
        }

        if response.is_error() {
            return Err(SruError::HttpStatus {
                status: response.status,
                url: response.url,
            });
        }

        let envelope = ResponseEnvelope::new(response, params.clone(), self.encoding);
        let error = protocol_error(&envelope.xml()?, self.version.namespace());
        match error {
            Some(error) => Err(error.into()),
            None => Ok(envelope),
        }
    }
}

/// Find the error a server reports inside a response document.
///
/// Only an `error` element in the SRU namespace counts. Diagnostics are
/// part of the normal response and never fail a request.
pub fn protocol_error(doc: &Document<'_>, namespace: &str) -> Option<ProtocolError> {
    let error = doc
        .root_element()
        .descendants()
        .find(|node| has_qualified_tag(*node, namespace, "error"))?;
    let code = error.attribute("code").unwrap_or(UNKNOWN_ERROR_CODE);
    Some(ProtocolError::new(code, get_text(error)))
}
