//! End-to-end tests of the client against a mock SRU server.
//!
//! The blocking `reqwest` client must not run on the async runtime, so
//! every client call goes through `spawn_blocking`.

use std::time::Duration;

use pretty_assertions::assert_eq;
use sru_harvester::config::{HttpMethod, SruVersion};
use sru_harvester::error::ProtocolErrorKind;
use sru_harvester::{ClientConfig, Explain, Record, Result, SearchRequest, SruClient, SruError};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SRU_2: &str = "http://docs.oasis-open.org/ns/search-ws/sruResponse";

/// A searchRetrieve page with records `start..start + count`.
fn page(total: u32, start: u32, count: u32) -> String {
    let records: String = (start..start + count)
        .map(|n| {
            format!(
                "<sru:record><sru:recordSchema>dc</sru:recordSchema><sru:recordData>\
                 <dc xmlns=\"http://purl.org/dc/elements/1.1/\"><title>Record {n}</title></dc>\
                 </sru:recordData><sru:recordPosition>{n}</sru:recordPosition></sru:record>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<sru:searchRetrieveResponse xmlns:sru="{SRU_2}">
  <sru:version>2.0</sru:version>
  <sru:numberOfRecords>{total}</sru:numberOfRecords>
  <sru:records>{records}</sru:records>
</sru:searchRetrieveResponse>"#
    )
}

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "application/xml")
        .set_body_string(body)
}

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(format!("{}/sru", server.uri())).with_timeout(Duration::from_secs(5))
}

fn title(record: &Record) -> String {
    record
        .data()
        .get("title")
        .and_then(|v| v.as_text())
        .unwrap_or_default()
        .to_string()
}

/// Run a search on a blocking thread and collect its records.
async fn search(config: ClientConfig, request: SearchRequest) -> Result<Vec<Record>> {
    tokio::task::spawn_blocking(move || -> Result<Vec<Record>> {
        let client = SruClient::new(config)?;
        let records = client.search_retrieve(&request)?.collect();
        records
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_pages_through_result_set() {
    let server = MockServer::start().await;
    for (start, count) in [(1, 10), (11, 10), (21, 5)] {
        Mock::given(method("GET"))
            .and(path("/sru"))
            .and(query_param("query", "dc.title = dune"))
            .and(query_param("startRecord", start.to_string()))
            .and(query_param("maximumRecords", "10"))
            .respond_with(xml(page(25, start, count)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = config(&server).with_page_size_threshold(10);
    let records = search(config, SearchRequest::new("dc.title = dune"))
        .await
        .unwrap();

    assert_eq!(records.len(), 25);
    assert_eq!(title(&records[0]), "Record 1");
    assert_eq!(title(&records[24]), "Record 25");
    assert_eq!(records[10].position(), Some(11));
    assert_eq!(records[0].schema(), Some("dc"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_post_sends_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sru"))
        .and(body_string_contains("query=dune"))
        .and(body_string_contains("operation=searchRetrieve"))
        .and(body_string_contains("version=1.2"))
        .respond_with(xml(page(2, 1, 2).replace(SRU_2, "http://www.loc.gov/zing/srw/")))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server)
        .with_http_method(HttpMethod::Post)
        .with_version(SruVersion::V1_2);
    let records = search(config, SearchRequest::new("dune")).await.unwrap();

    assert_eq!(records.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_retries_on_503() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(xml(page(1, 1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server).with_max_retries(2);
    let records = search(config, SearchRequest::new("dune")).await.unwrap();

    assert_eq!(records.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_retries_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "0"))
        .expect(3)
        .mount(&server)
        .await;

    let config = config(&server).with_max_retries(2);
    let err = search(config, SearchRequest::new("dune")).await.unwrap_err();

    assert!(matches!(err, SruError::HttpStatus { status: 503, .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_protocol_error_with_200() {
    let server = MockServer::start().await;
    let body = format!(
        r#"<sru:searchRetrieveResponse xmlns:sru="{SRU_2}"><sru:error code="unsupportedParameter">bad parameter</sru:error></sru:searchRetrieveResponse>"#
    );
    Mock::given(method("GET"))
        .respond_with(xml(body))
        .mount(&server)
        .await;

    let err = search(config(&server), SearchRequest::new("dune"))
        .await
        .unwrap_err();

    assert_eq!(
        err.protocol_kind(),
        Some(ProtocolErrorKind::UnsupportedParameter)
    );
    assert!(err.to_string().contains("bad parameter"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_explain() {
    let server = MockServer::start().await;
    let body = format!(
        r#"<sru:explainResponse xmlns:sru="{SRU_2}">
  <sru:record>
    <sru:recordData>
      <explain xmlns="http://explain.z3950.org/dtd/2.0/">
        <serverInfo><host>localhost</host><port>80</port></serverInfo>
        <indexInfo><index><title>title</title></index><index><title>creator</title></index></indexInfo>
      </explain>
    </sru:recordData>
  </sru:record>
</sru:explainResponse>"#
    );
    Mock::given(method("GET"))
        .and(path("/sru"))
        .respond_with(xml(body))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server);
    let explain = tokio::task::spawn_blocking(move || -> Result<Explain> {
        SruClient::new(config)?.explain()
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(explain.key(), "explain");
    let indexes = explain
        .data()
        .get("indexInfo")
        .and_then(|info| info.get("index"))
        .unwrap();
    assert_eq!(indexes.one_or_many().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_custom_http_client_sends_default_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-api-key", "secret"))
        .respond_with(xml(page(1, 1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server);
    let records = tokio::task::spawn_blocking(move || -> Result<Vec<Record>> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-api-key", reqwest::header::HeaderValue::from_static("secret"));
        let http = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .build()?;
        let client = SruClient::with_http_client(config, http)?;
        let records = client.search_retrieve(&SearchRequest::new("dune"))?.collect();
        records
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(records.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_latin1_response_is_decoded() {
    let server = MockServer::start().await;
    let body = page(1, 1, 1)
        .replace(r#"encoding="UTF-8""#, r#"encoding="ISO-8859-1""#)
        .replace("Record 1", "Caf\u{e9}");
    let bytes: Vec<u8> = body
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap())
        .collect();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .mount(&server)
        .await;

    let records = search(config(&server), SearchRequest::new("dune"))
        .await
        .unwrap();

    assert_eq!(title(&records[0]), "Caf\u{e9}");
}

#[test]
fn test_connection_refused() {
    let config = ClientConfig::new("http://127.0.0.1:1/sru").with_timeout(Duration::from_secs(5));
    let client = SruClient::new(config).unwrap();

    let err = client.search_retrieve(&SearchRequest::new("dune")).err().unwrap();
    assert!(matches!(err, SruError::Transport(_)));
}
