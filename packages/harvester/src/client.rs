//! Client facade over the harvester and the record iterator.

use crate::config::{ClientConfig, SruVersion};
use crate::error::{Result, SruError};
use crate::harvester::{Harvester, SleepFn};
use crate::http::{ReqwestTransport, Transport};
use crate::iterator::RecordIterator;
use crate::models::Explain;
use crate::response::ResponseEnvelope;
use crate::types::{RequestParameters, SearchRequest};
use crate::xml::NamespacePolicy;

/// Client for one SRU endpoint.
///
/// # Examples
/// ```no_run
/// use sru_harvester::{ClientConfig, SearchRequest, SruClient};
///
/// let client = SruClient::new(ClientConfig::new("https://sru.example.org/sru"))?;
/// for record in client.search_retrieve(&SearchRequest::new("dc.title = dune"))? {
///     println!("{}", record?.key());
/// }
/// # Ok::<(), sru_harvester::SruError>(())
/// ```
pub struct SruClient {
    harvester: Harvester,
    page_size_threshold: u32,
    namespace_policy: NamespacePolicy,
}

impl SruClient {
    /// Create a client that talks HTTP through `reqwest`.
    ///
    /// Fails with a configuration error if the endpoint or any other
    /// setting is invalid; nothing is sent.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout)?;
        Self::with_transport(config, Box::new(transport))
    }

    /// Create a client that sends its requests through `http`.
    ///
    /// Default headers, authentication, proxies and TLS settings are taken
    /// from `http`; the configured timeout is not applied.
    pub fn with_http_client(config: ClientConfig, http: reqwest::blocking::Client) -> Result<Self> {
        Self::with_transport(config, Box::new(ReqwestTransport::with_client(http)))
    }

    /// Create a client on top of another transport.
    pub fn with_transport(config: ClientConfig, transport: Box<dyn Transport>) -> Result<Self> {
        let harvester = Harvester::new(&config, transport)?;
        Ok(Self {
            harvester,
            page_size_threshold: config.page_size_threshold,
            namespace_policy: config.namespace_policy,
        })
    }

    /// Replace the function used to wait between retries.
    #[must_use]
    pub fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.harvester = self.harvester.with_sleep(sleep);
        self
    }

    pub fn version(&self) -> SruVersion {
        self.harvester.version()
    }

    /// Send one request with the given parameters, as is.
    ///
    /// # Returns
    /// * `Err(SruError::MissingParameter)` if `query` is absent or empty
    pub fn harvest(&self, params: &RequestParameters) -> Result<ResponseEnvelope> {
        if !params.get("query").is_some_and(|query| !query.trim().is_empty()) {
            return Err(SruError::MissingParameter("query".to_string()));
        }
        self.harvester.fetch(params)
    }

    /// Search and iterate over every matching record, page by page.
    ///
    /// The first page is requested before this returns.
    pub fn search_retrieve(&self, request: &SearchRequest) -> Result<RecordIterator<'_>> {
        let params = request.to_parameters(self.version())?;
        RecordIterator::new(
            &self.harvester,
            params,
            self.page_size_threshold,
            self.namespace_policy,
        )
    }

    /// Ask the server to describe itself.
    pub fn explain(&self) -> Result<Explain> {
        let version = self.version();
        let params = if version.requires_operation_parameter() {
            RequestParameters::new()
                .with("operation", "explain")
                .with("version", version.as_str())
        } else {
            RequestParameters::new()
        };
        let response = self.harvester.fetch(&params)?;
        Explain::from_response(&response, self.namespace_policy)
    }
}
