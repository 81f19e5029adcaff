//! Error types for the SRU harvester.
//!
//! `SruError` is the single error type surfaced by the library. Errors a
//! server reports inside an otherwise successful response are carried by
//! [`ProtocolError`], whose [`ProtocolErrorKind`] is chosen from a closed list
//! of known error codes.

use std::fmt;

use thiserror::Error;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum SruError {
    /// HTTP method other than GET or POST.
    #[error("Invalid HTTP method: '{0}'. Must be GET or POST")]
    InvalidHttpMethod(String),

    /// Protocol version not supported by this client.
    #[error("Invalid protocol version: '{0}'. Must be 2.0, 1.2 or 1.1")]
    UnsupportedVersion(String),

    /// Endpoint is not an absolute http(s) URL.
    #[error("Invalid endpoint URL: '{0}'")]
    InvalidEndpoint(String),

    /// Any other invalid client setting.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Required request parameter absent or empty.
    #[error("Request parameter '{0}' must be set")]
    MissingParameter(String),

    /// HTTP request failed before a status was received.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Connection-level failure reported by a non-reqwest transport.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Final response status was an error after all retries.
    #[error("HTTP {status} returned by {url}")]
    HttpStatus { status: u16, url: String },

    /// Server reported an error inside the response document.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Expected element missing from a well-formed response.
    #[error("Malformed response: missing <{element}> in {context}")]
    MalformedResponse { element: String, context: String },

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// A record iterator was advanced after it failed.
    #[error("Record iterator was terminated by an earlier error")]
    IteratorTerminated,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl SruError {
    /// Whether this error was raised while validating client settings.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidHttpMethod(_)
                | Self::UnsupportedVersion(_)
                | Self::InvalidEndpoint(_)
                | Self::InvalidConfig(_)
        )
    }

    /// The protocol error kind, if this is a server-reported error.
    #[must_use]
    pub fn protocol_kind(&self) -> Option<ProtocolErrorKind> {
        match self {
            Self::Protocol(error) => Some(error.kind),
            _ => None,
        }
    }

    pub(crate) fn malformed(element: &str, context: &str) -> Self {
        Self::MalformedResponse {
            element: element.to_string(),
            context: context.to_string(),
        }
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, SruError>;

/// Error reported by an SRU server inside a response document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SRU {kind} error ({code}): {description}")]
pub struct ProtocolError {
    /// Kind derived from `code`.
    pub kind: ProtocolErrorKind,
    /// Error code as sent by the server.
    pub code: String,
    /// Human-readable description sent by the server.
    pub description: String,
}

impl ProtocolError {
    /// Build an error from a server code and description.
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            kind: ProtocolErrorKind::from_code(&code),
            code,
            description: description.into(),
        }
    }
}

/// Prefix of SRU diagnostic URIs.
const DIAGNOSTIC_URI_PREFIX: &str = "info:srw/diagnostic/1/";

/// Known kinds of server-reported errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolErrorKind {
    /// General system error.
    General,
    /// System temporarily unavailable.
    System,
    /// Operation not supported by the server.
    UnsupportedOperation,
    /// Protocol version not supported by the server.
    UnsupportedVersion,
    /// Parameter not supported by the server.
    UnsupportedParameter,
    /// Parameter value not supported by the server.
    UnsupportedParameterValue,
    /// Mandatory parameter missing from the request.
    MandatoryParameterNotSupplied,
    /// Query could not be parsed or executed.
    QuerySyntax,
    /// Result set problem.
    ResultSet,
    /// Record retrieval problem.
    Record,
    /// Sorting problem.
    Sort,
    /// Code not in the list above.
    Unknown,
}

impl ProtocolErrorKind {
    /// Map a server error code to a kind.
    ///
    /// Named codes are matched after upper-casing their first letter
    /// (`general` and `General` are the same kind). Diagnostic URIs of the
    /// form `info:srw/diagnostic/1/N` are mapped by their number.
    ///
    /// # Examples
    /// ```
    /// use sru_harvester::error::ProtocolErrorKind;
    ///
    /// assert_eq!(ProtocolErrorKind::from_code("general"), ProtocolErrorKind::General);
    /// assert_eq!(
    ///     ProtocolErrorKind::from_code("info:srw/diagnostic/1/10"),
    ///     ProtocolErrorKind::QuerySyntax
    /// );
    /// assert_eq!(ProtocolErrorKind::from_code("os.system"), ProtocolErrorKind::Unknown);
    /// ```
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        if let Some(number) = code.strip_prefix(DIAGNOSTIC_URI_PREFIX) {
            return number
                .parse::<u32>()
                .map_or(Self::Unknown, Self::from_diagnostic_number);
        }

        match capitalize(code).as_str() {
            "General" => Self::General,
            "System" => Self::System,
            "UnsupportedOperation" => Self::UnsupportedOperation,
            "UnsupportedVersion" => Self::UnsupportedVersion,
            "UnsupportedParameter" => Self::UnsupportedParameter,
            "UnsupportedParameterValue" => Self::UnsupportedParameterValue,
            "MandatoryParameterNotSupplied" => Self::MandatoryParameterNotSupplied,
            "QuerySyntax" | "QuerySyntaxError" => Self::QuerySyntax,
            "ResultSet" => Self::ResultSet,
            "Record" => Self::Record,
            "Sort" => Self::Sort,
            _ => Self::Unknown,
        }
    }

    /// Map an SRU diagnostic number to a kind.
    #[must_use]
    pub fn from_diagnostic_number(number: u32) -> Self {
        match number {
            1 | 3 => Self::General,
            2 => Self::System,
            4 => Self::UnsupportedOperation,
            5 => Self::UnsupportedVersion,
            6 => Self::UnsupportedParameterValue,
            7 => Self::MandatoryParameterNotSupplied,
            8 => Self::UnsupportedParameter,
            10..=49 => Self::QuerySyntax,
            50..=59 => Self::ResultSet,
            60..=79 => Self::Record,
            80..=99 => Self::Sort,
            _ => Self::Unknown,
        }
    }

    /// Get the string value used in messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::System => "system",
            Self::UnsupportedOperation => "unsupported operation",
            Self::UnsupportedVersion => "unsupported version",
            Self::UnsupportedParameter => "unsupported parameter",
            Self::UnsupportedParameterValue => "unsupported parameter value",
            Self::MandatoryParameterNotSupplied => "mandatory parameter not supplied",
            Self::QuerySyntax => "query syntax",
            Self::ResultSet => "result set",
            Self::Record => "record",
            Self::Sort => "sort",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProtocolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper-case the first character, leaving the rest untouched.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SruError::InvalidHttpMethod("PUT".to_string());
        assert!(err.to_string().contains("PUT"));
        assert!(err.to_string().contains("GET or POST"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_parameter_display() {
        let err = SruError::MissingParameter("query".to_string());
        assert_eq!(err.to_string(), "Request parameter 'query' must be set");
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_malformed_response_display() {
        let err = SruError::malformed("recordData", "explain response");
        assert_eq!(
            err.to_string(),
            "Malformed response: missing <recordData> in explain response"
        );
    }

    #[test]
    fn test_protocol_error_display() {
        let err: SruError = ProtocolError::new("general", "boom").into();
        assert_eq!(err.to_string(), "SRU general error (general): boom");
        assert_eq!(err.protocol_kind(), Some(ProtocolErrorKind::General));
    }

    #[test]
    fn test_named_codes_are_capitalized() {
        assert_eq!(
            ProtocolErrorKind::from_code("unsupportedVersion"),
            ProtocolErrorKind::UnsupportedVersion
        );
        assert_eq!(
            ProtocolErrorKind::from_code("UnsupportedVersion"),
            ProtocolErrorKind::UnsupportedVersion
        );
        assert_eq!(
            ProtocolErrorKind::from_code(" system "),
            ProtocolErrorKind::System
        );
    }

    #[test]
    fn test_unknown_codes_fall_back() {
        assert_eq!(ProtocolErrorKind::from_code(""), ProtocolErrorKind::Unknown);
        assert_eq!(
            ProtocolErrorKind::from_code("UNKNOWN"),
            ProtocolErrorKind::Unknown
        );
        assert_eq!(
            ProtocolErrorKind::from_code("__class__"),
            ProtocolErrorKind::Unknown
        );
    }

    #[test]
    fn test_diagnostic_uris() {
        assert_eq!(
            ProtocolErrorKind::from_code("info:srw/diagnostic/1/7"),
            ProtocolErrorKind::MandatoryParameterNotSupplied
        );
        assert_eq!(
            ProtocolErrorKind::from_code("info:srw/diagnostic/1/61"),
            ProtocolErrorKind::Record
        );
        assert_eq!(
            ProtocolErrorKind::from_code("info:srw/diagnostic/1/abc"),
            ProtocolErrorKind::Unknown
        );
        assert_eq!(
            ProtocolErrorKind::from_code("info:srw/diagnostic/1/1000"),
            ProtocolErrorKind::Unknown
        );
    }
}
