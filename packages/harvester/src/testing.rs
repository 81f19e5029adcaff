//! Test doubles and response fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::SRU_2_NAMESPACE;
use crate::error::{Result, SruError};
use crate::http::{HttpRequest, HttpResponse, Transport};

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync;

/// Shared log of the requests a [`MockTransport`] received.
pub type RequestLog = Arc<Mutex<Vec<HttpRequest>>>;

/// Transport answering requests from a closure and recording each request.
pub struct MockTransport {
    handler: Box<Handler>,
    log: RequestLog,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            log: RequestLog::default(),
        }
    }

    /// Answer with the given responses in order; further requests fail.
    pub fn queue(responses: Vec<HttpResponse>) -> Self {
        let responses = Mutex::new(VecDeque::from(responses));
        Self::new(move |_| {
            responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| SruError::Connection("no response queued".to_string()))
        })
    }

    /// Serve `total` records, honouring `startRecord` and `maximumRecords`.
    pub fn paging(total: u32) -> Self {
        Self::new(move |request| {
            let start: u32 = request
                .param("startRecord")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            let max = request
                .param("maximumRecords")
                .and_then(|v| v.parse().ok())
                .unwrap_or(total);
            let count = total.saturating_sub(start.saturating_sub(1)).min(max);
            Ok(ok(search_response(total, start, count)))
        })
    }

    /// Handle to the request log, usable after the transport is boxed.
    pub fn log(&self) -> RequestLog {
        Arc::clone(&self.log)
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.log.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

/// A 200 response with the given body.
pub fn ok(body: impl Into<String>) -> HttpResponse {
    HttpResponse {
        status: 200,
        retry_after: None,
        content_type: Some("text/xml; charset=UTF-8".to_string()),
        body: body.into().into_bytes(),
        url: "http://localhost/sru".to_string(),
    }
}

/// An error response with an optional `Retry-After` value.
pub fn status(code: u16, retry_after: Option<&str>) -> HttpResponse {
    HttpResponse {
        status: code,
        retry_after: retry_after.map(str::to_string),
        content_type: Some("text/html".to_string()),
        body: b"<html>unavailable</html>".to_vec(),
        url: "http://localhost/sru".to_string(),
    }
}

/// A Dublin Core record payload.
fn dc_record(namespace: &str, position: u32) -> String {
    format!(
        r#"<sru:record>
      <sru:recordSchema>info:srw/schema/1/dc-v1.1</sru:recordSchema>
      <sru:recordData>
        <dc:dc xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Record {position}</dc:title></dc:dc>
      </sru:recordData>
      <sru:recordPosition>{position}</sru:recordPosition>
    </sru:record>"#
    )
    .replace("sru:", &format!("{}:", prefix(namespace)))
}

fn prefix(namespace: &str) -> &'static str {
    if namespace == SRU_2_NAMESPACE {
        "sru"
    } else {
        "srw"
    }
}

fn page(namespace: &str, total: Option<u32>, start: u32, count: u32) -> String {
    let p = prefix(namespace);
    let total = total
        .map(|t| format!("<{p}:numberOfRecords>{t}</{p}:numberOfRecords>"))
        .unwrap_or_default();
    let records: String = (start..start + count)
        .map(|position| dc_record(namespace, position))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<{p}:searchRetrieveResponse xmlns:{p}="{namespace}">
  <{p}:version>2.0</{p}:version>
  {total}
  <{p}:records>{records}</{p}:records>
  <{p}:echoedSearchRetrieveRequest>
    <{p}:query>dune</{p}:query>
    <{p}:startRecord>{start}</{p}:startRecord>
  </{p}:echoedSearchRetrieveRequest>
</{p}:searchRetrieveResponse>"#
    )
}

/// An SRU 2.0 searchRetrieve page holding records `start..start + count`.
pub fn search_response(total: u32, start: u32, count: u32) -> String {
    page(SRU_2_NAMESPACE, Some(total), start, count)
}

/// Same as [`search_response`] in the SRU 1.x namespace.
pub fn search_response_v1(total: u32, start: u32, count: u32) -> String {
    page(crate::config::SRU_1_NAMESPACE, Some(total), start, count)
}

/// A searchRetrieve page without `numberOfRecords`.
pub fn search_response_without_total(count: u32) -> String {
    page(SRU_2_NAMESPACE, None, 1, count)
}

/// A response carrying an `error` element.
pub fn error_response(code: &str, description: &str) -> String {
    format!(
        r#"<sru:searchRetrieveResponse xmlns:sru="{SRU_2_NAMESPACE}"><sru:error code="{code}">{description}</sru:error></sru:searchRetrieveResponse>"#
    )
}

/// A response with no records and one diagnostic.
pub fn diagnostic_response(uri: &str, message: &str) -> String {
    format!(
        r#"<sru:searchRetrieveResponse xmlns:sru="{SRU_2_NAMESPACE}">
  <sru:numberOfRecords>0</sru:numberOfRecords>
  <sru:diagnostics>
    <diag:diagnostic xmlns:diag="http://docs.oasis-open.org/ns/search-ws/diagnostic">
      <diag:uri>{uri}</diag:uri>
      <diag:details>dc.titel</diag:details>
      <diag:message>{message}</diag:message>
    </diag:diagnostic>
  </sru:diagnostics>
</sru:searchRetrieveResponse>"#
    )
}

/// An SRU 2.0 explain response.
pub const SRU_2_EXPLAIN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sru:explainResponse xmlns:sru="http://docs.oasis-open.org/ns/search-ws/sruResponse">
  <sru:version>2.0</sru:version>
  <sru:record>
    <sru:recordSchema>http://explain.z3950.org/dtd/2.0/</sru:recordSchema>
    <sru:recordXMLEscaping>xml</sru:recordXMLEscaping>
    <sru:recordData>
      <zr:explain xmlns:zr="http://explain.z3950.org/dtd/2.0/">
        <zr:serverInfo protocol="SRU">
          <zr:host>sru.example.org</zr:host>
          <zr:port>80</zr:port>
          <zr:database>catalogue</zr:database>
        </zr:serverInfo>
        <zr:databaseInfo>
          <zr:title>Example catalogue</zr:title>
        </zr:databaseInfo>
      </zr:explain>
    </sru:recordData>
  </sru:record>
  <sru:echoedExplainRequest>
    <sru:version>2.0</sru:version>
  </sru:echoedExplainRequest>
</sru:explainResponse>"#;

/// An explain response in the given SRU namespace, without echo.
pub fn explain_response(namespace: &str) -> String {
    format!(
        r#"<explainResponse xmlns="{namespace}">
  <version>1.2</version>
  <record>
    <recordPacking>xml</recordPacking>
    <recordData><explain xmlns="http://explain.z3950.org/dtd/2.0/"><serverInfo><host>localhost</host></serverInfo></explain></recordData>
  </record>
</explainResponse>"#
    )
}
