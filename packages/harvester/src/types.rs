//! Request-side data types.

use crate::config::{SruVersion, DEFAULT_START_RECORD};
use crate::error::{Result, SruError};

/// Ordered set of SRU request parameters.
///
/// Setting an existing parameter replaces its value in place, so the order
/// in which parameters are sent stays stable across pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParameters {
    params: Vec<(String, String)>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        match self.params.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.params.push((name.to_string(), value)),
        }
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Parse a parameter as an unsigned integer.
    pub fn get_u32(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(|value| value.trim().parse().ok())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            let key: String = key.into();
            let value: String = value.into();
            params.set(&key, value);
        }
        params
    }
}

/// A `searchRetrieve` request as seen by the caller.
///
/// # Examples
/// ```
/// use sru_harvester::config::SruVersion;
/// use sru_harvester::types::SearchRequest;
///
/// let params = SearchRequest::new("dc.title = dune")
///     .with_maximum_records(250)
///     .with_record_schema("marcxml")
///     .to_parameters(SruVersion::V2_0)
///     .unwrap();
///
/// assert_eq!(params.get("query"), Some("dc.title = dune"));
/// assert_eq!(params.get("startRecord"), Some("1"));
/// assert_eq!(params.get("maximumRecords"), Some("250"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// CQL query.
    pub query: String,
    /// 1-based position of the first record wanted.
    pub start_record: u32,
    /// Total number of records wanted; `None` or 0 means all of them.
    pub maximum_records: Option<u32>,
    /// Record schema requested from the server.
    pub record_schema: Option<String>,
    /// Additional parameters passed through verbatim.
    pub extra: Vec<(String, String)>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            start_record: DEFAULT_START_RECORD,
            maximum_records: None,
            record_schema: None,
            extra: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_start_record(mut self, start_record: u32) -> Self {
        self.start_record = start_record;
        self
    }

    #[must_use]
    pub fn with_maximum_records(mut self, maximum_records: u32) -> Self {
        self.maximum_records = Some(maximum_records);
        self
    }

    #[must_use]
    pub fn with_record_schema(mut self, schema: impl Into<String>) -> Self {
        self.record_schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    /// Build the request parameters for a protocol version.
    ///
    /// # Returns
    /// * `Err(SruError::MissingParameter)` if the query is empty
    pub fn to_parameters(&self, version: SruVersion) -> Result<RequestParameters> {
        if self.query.trim().is_empty() {
            return Err(SruError::MissingParameter("query".to_string()));
        }

        let mut params = RequestParameters::new();
        if version.requires_operation_parameter() {
            params.set("operation", "searchRetrieve");
            params.set("version", version);
        }
        params.set("query", &self.query);
        params.set("startRecord", self.start_record.max(1));
        if let Some(maximum) = self.maximum_records.filter(|&n| n > 0) {
            params.set("maximumRecords", maximum);
        }
        if let Some(schema) = &self.record_schema {
            params.set("recordSchema", schema);
        }
        for (name, value) in &self.extra {
            params.set(name, value);
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut params = RequestParameters::new()
            .with("query", "x")
            .with("startRecord", 1);
        params.set("startRecord", 11);
        params.set("maximumRecords", 10);

        assert_eq!(
            params.as_pairs(),
            &[
                ("query".to_string(), "x".to_string()),
                ("startRecord".to_string(), "11".to_string()),
                ("maximumRecords".to_string(), "10".to_string()),
            ]
        );
        assert_eq!(params.get_u32("startRecord"), Some(11));
        assert_eq!(params.get_u32("query"), None);
    }

    #[test]
    fn test_from_iterator() {
        let params: RequestParameters = [("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        assert_eq!(params.get("a"), Some("3"));
        assert_eq!(params.as_pairs().len(), 2);
    }

    #[test]
    fn test_search_request_defaults() {
        let params = SearchRequest::new("dog")
            .to_parameters(SruVersion::V2_0)
            .unwrap();

        assert_eq!(params.get("query"), Some("dog"));
        assert_eq!(params.get("startRecord"), Some("1"));
        assert!(!params.contains("maximumRecords"));
        assert!(!params.contains("operation"));
        assert!(!params.contains("version"));
    }

    #[test]
    fn test_search_request_sru_1() {
        let params = SearchRequest::new("dog")
            .to_parameters(SruVersion::V1_2)
            .unwrap();

        assert_eq!(params.get("operation"), Some("searchRetrieve"));
        assert_eq!(params.get("version"), Some("1.2"));
    }

    #[test]
    fn test_search_request_zero_maximum_means_all() {
        let params = SearchRequest::new("dog")
            .with_maximum_records(0)
            .to_parameters(SruVersion::V2_0)
            .unwrap();
        assert!(!params.contains("maximumRecords"));
    }

    #[test]
    fn test_search_request_extra_params() {
        let params = SearchRequest::new("dog")
            .with_param("recordXMLEscaping", "xml")
            .with_param("httpAccept", "application/sru+xml")
            .to_parameters(SruVersion::V2_0)
            .unwrap();
        assert_eq!(params.get("recordXMLEscaping"), Some("xml"));
        assert_eq!(params.get("httpAccept"), Some("application/sru+xml"));
    }

    #[test]
    fn test_search_request_requires_query() {
        let err = SearchRequest::new("  ")
            .to_parameters(SruVersion::V2_0)
            .unwrap_err();
        assert!(matches!(err, SruError::MissingParameter(p) if p == "query"));
    }
}
