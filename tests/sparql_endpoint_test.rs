//! SPARQL adapter against a mock HTTP endpoint

use rdfquery::adapter::{Backend, ResultFormat, SparqlAdapter, SparqlConfig, SparqlEngine};
use rdfquery::rdf::{NamedNode, Node, Variable};
use rdfquery::{QueryLanguage, QueryModel, RdfQueryError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KNOWS: &str = "http://xmlns.com/foaf/0.1/knows";
const BOB: &str = "http://example.org/bob";
const ALICE: &str = "http://example.org/alice";

fn var(name: &str) -> Variable {
    Variable::new(name).unwrap()
}

fn iri(s: &str) -> NamedNode {
    NamedNode::new(s).unwrap()
}

fn knows_bob() -> QueryModel {
    let mut model = QueryModel::new();
    model
        .add_binding_variables([var("s")])
        .add_condition(var("s"), iri(KNOWS), iri(BOB));
    model
}

fn backend(server: &MockServer, format: ResultFormat, engine: SparqlEngine) -> Backend {
    let config = SparqlConfig::new(format!("{}/sparql", server.uri()))
        .with_format(format)
        .with_engine(engine);
    Backend::from(SparqlAdapter::new(config).unwrap())
}

fn json_uris(var: &str, uris: &[&str]) -> String {
    let bindings: Vec<String> = uris
        .iter()
        .map(|u| format!(r#"{{"{var}": {{"type": "uri", "value": "{u}"}}}}"#))
        .collect();
    format!(
        r#"{{"head": {{"vars": ["{var}"]}}, "results": {{"bindings": [{}]}}}}"#,
        bindings.join(",")
    )
}

// ============================================================================
// JSON results
// ============================================================================

#[tokio::test]
async fn test_json_uri_round_trip() {
    let server = MockServer::start().await;
    let model = knows_bob();
    let expected_query = model.generate(QueryLanguage::Sparql).unwrap();

    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(query_param("query", expected_query.as_str()))
        .and(header("accept", "application/sparql-results+json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(json_uris("s", &[ALICE]), "application/sparql-results+json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server, ResultFormat::Json, SparqlEngine::Sesame2);
    let output = model.execute(&backend).await.unwrap();
    let rows = output.rows().unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get(0).and_then(Node::as_uri), Some(ALICE));
}

#[tokio::test]
async fn test_query_with_streams_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(json_uris("s", &[ALICE, BOB]), "application/sparql-results+json"),
        )
        .mount(&server)
        .await;

    let backend = backend(&server, ResultFormat::Json, SparqlEngine::Sesame2);
    let mut seen = Vec::new();
    let count = backend
        .query_with("SELECT ?s WHERE { ?s ?p ?o . }", |row| {
            seen.push(row.get(0).map(|n| n.value().to_string()))
        })
        .await
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(seen, vec![Some(ALICE.to_string()), Some(BOB.to_string())]);
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>", "text/html"))
        .mount(&server)
        .await;

    let backend = backend(&server, ResultFormat::Json, SparqlEngine::Sesame2);
    let err = backend.query("SELECT * WHERE { }").await.unwrap_err();
    assert!(matches!(err, RdfQueryError::ResultDecode { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_size_counts_all_triples() {
    let server = MockServer::start().await;
    let body = r#"{"head": {"vars": ["s", "p", "o"]}, "results": {"bindings": [
        {"s": {"type": "uri", "value": "http://a/1"}, "p": {"type": "uri", "value": "http://a/p"}, "o": {"type": "literal", "value": "x"}},
        {"s": {"type": "uri", "value": "http://a/2"}, "p": {"type": "uri", "value": "http://a/p"}, "o": {"type": "literal", "value": "y"}},
        {"s": {"type": "bnode", "value": "b"}, "p": {"type": "uri", "value": "http://a/p"}, "o": {"type": "literal", "value": "z"}}
    ]}}"#;
    Mock::given(method("GET"))
        .and(query_param("query", "SELECT ?s ?p ?o WHERE { ?s ?p ?o . }"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/sparql-results+json"))
        .mount(&server)
        .await;

    let backend = backend(&server, ResultFormat::Json, SparqlEngine::Sesame2);
    assert_eq!(backend.size().await.unwrap(), 3);
}

// ============================================================================
// Engine quirks and unsupported features
// ============================================================================

#[tokio::test]
async fn test_yars2_strips_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(json_uris("s", &[ALICE]), "application/sparql-results+json"),
        )
        .mount(&server)
        .await;

    let mut model = knows_bob();
    model.set_distinct();
    assert!(model.generate(QueryLanguage::Sparql).unwrap().contains("DISTINCT"));

    let backend = backend(&server, ResultFormat::Json, SparqlEngine::Yars2);
    model.execute(&backend).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let (_, sent) = requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "query")
        .unwrap();
    assert!(sent.starts_with("SELECT ?s WHERE"), "sent {sent}");
}

#[tokio::test]
async fn test_counting_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut model = QueryModel::new();
    model
        .add_counting_variable(var("s"))
        .unwrap()
        .add_condition(var("s"), iri(KNOWS), var("o"));

    let backend = backend(&server, ResultFormat::Json, SparqlEngine::Sesame2);
    let err = model.execute(&backend).await.unwrap_err();
    assert!(matches!(
        err,
        RdfQueryError::UnsupportedFeature {
            language: QueryLanguage::Sparql,
            ..
        }
    ));
}

// ============================================================================
// Transport failures and cancellation
// ============================================================================

#[tokio::test]
async fn test_server_error_is_backend_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let backend = backend(&server, ResultFormat::Json, SparqlEngine::Sesame2);
    let err = knows_bob().execute(&backend).await.unwrap_err();
    match err {
        RdfQueryError::BackendUnavailable { endpoint, reason } => {
            assert_eq!(endpoint, format!("{}/sparql", server.uri()));
            assert!(reason.contains("500"), "reason {reason}");
        }
        other => panic!("expected BackendUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_backend_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/sparql", listener.local_addr().unwrap());
    drop(listener);

    let backend = Backend::from(SparqlAdapter::new(SparqlConfig::new(url.clone())).unwrap());
    let result = knows_bob().execute(&backend).await;
    match result {
        Err(RdfQueryError::BackendUnavailable { endpoint, .. }) => assert_eq!(endpoint, url),
        other => panic!("expected BackendUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancellation_aborts_slow_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(json_uris("s", &[ALICE]), "application/sparql-results+json")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let backend = backend(&server, ResultFormat::Json, SparqlEngine::Sesame2);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        backend.query_cancellable("SELECT * WHERE { }", &token),
    )
    .await
    .expect("cancellation should end the query promptly");
    assert!(matches!(result, Err(RdfQueryError::Cancelled)));
}

/// Serve one chunked SPARQL XML response that sends `rows` results and then
/// stalls without finishing the document. Reports when the client hangs up.
async fn stalling_xml_endpoint(rows: usize) -> (String, tokio::sync::oneshot::Receiver<()>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/sparql", listener.local_addr().unwrap());
    let (closed_tx, closed_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let mut body = String::from(
            r#"<?xml version="1.0"?><sparql xmlns="http://www.w3.org/2005/sparql-results#"><head><variable name="s"/></head><results>"#,
        );
        for i in 0..rows {
            body.push_str(&format!(
                r#"<result><binding name="s"><uri>http://example.org/item/{i}</uri></binding></result>"#
            ));
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/sparql-results+xml\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n{}\r\n",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();

        // EOF or reset once the client drops the connection
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
        let _ = closed_tx.send(());
    });

    (url, closed_rx)
}

#[tokio::test]
async fn test_cancellation_mid_xml_stream() {
    const SENT: usize = 5;
    let (url, closed) = stalling_xml_endpoint(SENT).await;
    let config = SparqlConfig::new(url).with_format(ResultFormat::SparqlXml);
    let backend = Backend::from(SparqlAdapter::new(config).unwrap());

    let token = CancellationToken::new();
    let canceller = token.clone();
    let mut delivered = Vec::new();
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        backend.query_with_cancellable("SELECT ?s WHERE { ?s ?p ?o }", &token, |row| {
            delivered.push(row);
            if delivered.len() == SENT {
                canceller.cancel();
            }
        }),
    )
    .await
    .expect("cancellation should end the stalled stream");

    assert!(matches!(result, Err(RdfQueryError::Cancelled)));
    assert_eq!(delivered.len(), SENT);
    assert_eq!(
        delivered[SENT - 1].get(0).and_then(Node::as_uri),
        Some("http://example.org/item/4")
    );

    tokio::time::timeout(Duration::from_secs(5), closed)
        .await
        .expect("connection should be closed after cancellation")
        .unwrap();
}

// ============================================================================
// XML results over HTTP
// ============================================================================

#[tokio::test]
async fn test_sparql_xml_results() {
    let server = MockServer::start().await;
    let body = r#"<?xml version="1.0"?>
<sparql xmlns="http://www.w3.org/2005/sparql-results#">
  <head><variable name="s"/><variable name="name"/></head>
  <results>
    <result>
      <binding name="s"><uri>http://example.org/alice</uri></binding>
      <binding name="name"><literal xml:lang="en">Alice</literal></binding>
    </result>
  </results>
</sparql>"#;
    Mock::given(method("GET"))
        .and(header("accept", "application/sparql-results+xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/sparql-results+xml"))
        .mount(&server)
        .await;

    let backend = backend(&server, ResultFormat::SparqlXml, SparqlEngine::Sesame2);
    let rows = backend.query("SELECT ?s ?name WHERE { }").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get(0).and_then(Node::as_uri), Some(ALICE));
    assert_eq!(
        rows[0].get(1).and_then(Node::as_literal).and_then(|l| l.language()),
        Some("en")
    );
}

#[tokio::test]
async fn test_large_xml_response_is_counted_incrementally() {
    let server = MockServer::start().await;
    let mut body = String::from(r#"<sparql><head><variable name="s"/></head><results>"#);
    for i in 0..10_000 {
        body.push_str(&format!(
            r#"<result><binding name="s"><uri>http://example.org/r{i}</uri></binding></result>"#
        ));
    }
    body.push_str("</results></sparql>");
    Mock::given(method("GET"))
        .and(header("accept", "application/rdf+xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/rdf+xml"))
        .mount(&server)
        .await;

    let backend = backend(&server, ResultFormat::Xml, SparqlEngine::Virtuoso);
    let mut calls = 0usize;
    let mut last = None;
    let count = backend
        .query_with("SELECT ?s WHERE { }", |row| {
            calls += 1;
            last = row.get(0).map(|n| n.value().to_string());
        })
        .await
        .unwrap();

    assert_eq!(count, 10_000);
    assert_eq!(calls, 10_000);
    assert_eq!(last.as_deref(), Some("http://example.org/r9999"));
}

#[tokio::test]
async fn test_malformed_xml_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<sparql><head></sparql>", "application/sparql-results+xml"),
        )
        .mount(&server)
        .await;

    let backend = backend(&server, ResultFormat::SparqlXml, SparqlEngine::Joseki);
    let err = backend.query("SELECT * WHERE { }").await.unwrap_err();
    match err {
        RdfQueryError::ResultDecode { format, .. } => assert_eq!(format, "sparql-xml"),
        other => panic!("expected ResultDecode, got {other:?}"),
    }
}
