//! Configuration constants and validation functions for the harvester.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use encoding_rs::Encoding;
use url::Url;

use crate::error::{Result, SruError};
use crate::xml::NamespacePolicy;

/// Response namespace of SRU 2.0.
pub const SRU_2_NAMESPACE: &str = "http://docs.oasis-open.org/ns/search-ws/sruResponse";

/// Response namespace of SRU 1.1 and 1.2.
pub const SRU_1_NAMESPACE: &str = "http://www.loc.gov/zing/srw/";

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default number of retries after the first request (none).
pub const DEFAULT_MAX_RETRIES: u32 = 0;

/// Default delay before a retry when the server sends no `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// HTTP status codes retried by default.
pub const DEFAULT_RETRY_STATUS_CODES: &[u16] = &[503];

/// Upper bound for `maximumRecords` in a single request.
///
/// Larger caller limits are split into several pages of this size.
pub const DEFAULT_PAGE_SIZE_THRESHOLD: u32 = 100;

/// First record position of a result set.
pub const DEFAULT_START_RECORD: u32 = 1;

/// HTTP method used for SRU requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    /// Parameters in the query string.
    #[default]
    Get,
    /// Parameters as a form-encoded body.
    Post,
}

impl HttpMethod {
    /// Get the method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = SruError;

    /// Parse a method name.
    ///
    /// # Examples
    /// ```
    /// use sru_harvester::config::HttpMethod;
    ///
    /// assert_eq!("GET".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
    /// assert!("PUT".parse::<HttpMethod>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(SruError::InvalidHttpMethod(other.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SRU protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SruVersion {
    /// SRU 1.1.
    V1_1,
    /// SRU 1.2.
    V1_2,
    /// SRU 2.0.
    #[default]
    V2_0,
}

impl SruVersion {
    /// Get the version string sent in requests.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1_1 => "1.1",
            Self::V1_2 => "1.2",
            Self::V2_0 => "2.0",
        }
    }

    /// Namespace of response elements for this version.
    #[must_use]
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::V1_1 | Self::V1_2 => SRU_1_NAMESPACE,
            Self::V2_0 => SRU_2_NAMESPACE,
        }
    }

    /// SRU 1.x requires explicit `operation` and `version` parameters.
    #[must_use]
    pub fn requires_operation_parameter(&self) -> bool {
        matches!(self, Self::V1_1 | Self::V1_2)
    }
}

impl FromStr for SruVersion {
    type Err = SruError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1.1" => Ok(Self::V1_1),
            "1.2" => Ok(Self::V1_2),
            "2.0" => Ok(Self::V2_0),
            other => Err(SruError::UnsupportedVersion(other.to_string())),
        }
    }
}

impl fmt::Display for SruVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate an endpoint URL.
///
/// # Arguments
/// * `endpoint` - Base URL of the SRU server
///
/// # Returns
/// * `Ok(Url)` if the endpoint is an absolute http or https URL
/// * `Err(SruError::InvalidEndpoint)` otherwise
///
/// # Examples
/// ```
/// use sru_harvester::config::validate_endpoint;
///
/// assert!(validate_endpoint("https://sru.example.org/sru").is_ok());
/// assert!(validate_endpoint("ftp://example.org").is_err());
/// assert!(validate_endpoint("not a url").is_err());
/// ```
pub fn validate_endpoint(endpoint: &str) -> Result<Url> {
    let url =
        Url::parse(endpoint).map_err(|_| SruError::InvalidEndpoint(endpoint.to_string()))?;
    if matches!(url.scheme(), "http" | "https") && url.has_host() {
        Ok(url)
    } else {
        Err(SruError::InvalidEndpoint(endpoint.to_string()))
    }
}

/// Settings of an [`SruClient`](crate::client::SruClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the SRU server.
    pub endpoint: String,
    /// Transport method.
    pub http_method: HttpMethod,
    /// Protocol version.
    pub version: SruVersion,
    /// Retries after the first request.
    pub max_retries: u32,
    /// Status codes eligible for retry.
    pub retry_status_codes: Vec<u16>,
    /// Delay used when the server sends no usable `Retry-After` header.
    pub default_retry_after: Duration,
    /// Largest `maximumRecords` sent in one request.
    pub page_size_threshold: u32,
    /// Namespace handling when converting records.
    pub namespace_policy: NamespacePolicy,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Encoding label that overrides the encoding a response declares.
    pub encoding: Option<String>,
}

impl ClientConfig {
    /// Create a configuration with default settings for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http_method: HttpMethod::default(),
            version: SruVersion::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_status_codes: DEFAULT_RETRY_STATUS_CODES.to_vec(),
            default_retry_after: Duration::from_secs(DEFAULT_RETRY_AFTER_SECS),
            page_size_threshold: DEFAULT_PAGE_SIZE_THRESHOLD,
            namespace_policy: NamespacePolicy::default(),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            encoding: None,
        }
    }

    #[must_use]
    pub fn with_http_method(mut self, http_method: HttpMethod) -> Self {
        self.http_method = http_method;
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: SruVersion) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_retry_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retry_status_codes = codes.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_default_retry_after(mut self, delay: Duration) -> Self {
        self.default_retry_after = delay;
        self
    }

    #[must_use]
    pub fn with_page_size_threshold(mut self, threshold: u32) -> Self {
        self.page_size_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_namespace_policy(mut self, policy: NamespacePolicy) -> Self {
        self.namespace_policy = policy;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Decode every response with the encoding named by `label` (e.g.
    /// `"ISO-8859-1"`), whatever the response itself declares.
    #[must_use]
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    /// Encoding forced by [`with_encoding`](Self::with_encoding), if any.
    ///
    /// # Returns
    /// * `Err(SruError::InvalidConfig)` if the label names no known encoding
    pub fn forced_encoding(&self) -> Result<Option<&'static Encoding>> {
        self.encoding
            .as_deref()
            .map(|label| {
                Encoding::for_label(label.trim().as_bytes())
                    .ok_or_else(|| SruError::InvalidConfig(format!("unknown encoding '{label}'")))
            })
            .transpose()
    }

    /// Check the settings and return the parsed endpoint.
    pub fn validate(&self) -> Result<Url> {
        let url = validate_endpoint(&self.endpoint)?;
        self.forced_encoding()?;
        if self.page_size_threshold == 0 {
            return Err(SruError::InvalidConfig(
                "page size threshold must be at least 1".to_string(),
            ));
        }
        if let Some(code) = self
            .retry_status_codes
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(SruError::InvalidConfig(format!(
                "retry status code {code} is not an HTTP status"
            )));
        }
        Ok(url)
    }
}
