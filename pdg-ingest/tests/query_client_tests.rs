//! SPARQL client tests against a loopback HTTP server

use pdg_ingest::reconcile::validation::ValidationRules;
use pdg_ingest::services::{QueryError, QueryExecutor, SparqlClient};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Serve one canned response per connection; `None` never answers
///
/// Each received request (headers and body) is sent on the returned channel.
async fn spawn_server(
    response: Option<(u16, &'static str)>,
) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (requests_tx, requests_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let requests_tx = requests_tx.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                let _ = requests_tx.send(request);

                match response {
                    Some((status, body)) => {
                        let reply = format!(
                            "HTTP/1.1 {} Test\r\nContent-Type: application/sparql-results+json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(reply.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    None => {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            });
        }
    });

    (format!("http://{}/sparql", addr), requests_rx)
}

/// Read headers and the form body so closing the socket does not reset
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut buf).await else {
            break;
        };
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

fn client(endpoint: String, timeout: Duration) -> SparqlClient {
    SparqlClient::new(endpoint, "pdg-test/0.1", timeout, ValidationRules::default()).unwrap()
}

#[tokio::test]
async fn test_valid_response_parsed() {
    let body = r#"{"head": {"vars": []}, "results": {"bindings": [
        {"painting": {"type": "uri", "value": "http://www.wikidata.org/entity/Q12418"},
         "paintingLabel": {"type": "literal", "value": "Mona Lisa"},
         "height": {"type": "literal", "value": "77"},
         "width": {"type": "literal", "value": "53"}}
    ]}}"#;
    let (endpoint, _requests) = spawn_server(Some((200, body))).await;

    let bindings = client(endpoint, Duration::from_secs(5))
        .execute("FILTER(!BOUND(?inception))")
        .await
        .unwrap();

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].painting_label.as_ref().unwrap().value, "Mona Lisa");
    assert_eq!(bindings[0].width.as_ref().unwrap().value, "53");
}

#[tokio::test]
async fn test_request_is_form_post_with_headers() {
    let body = r#"{"head": {"vars": []}, "results": {"bindings": []}}"#;
    let (endpoint, mut requests) = spawn_server(Some((200, body))).await;

    let bindings = client(endpoint, Duration::from_secs(5))
        .execute("FILTER(!BOUND(?inception))")
        .await
        .unwrap();
    assert!(bindings.is_empty());

    let request = requests.recv().await.unwrap();
    let (head, form) = request.split_once("\r\n\r\n").unwrap();
    let head = head.to_ascii_lowercase();

    assert!(head.starts_with("post /sparql "));
    assert!(head.contains("accept: application/sparql-results+json"));
    assert!(head.contains("user-agent: pdg-test/0.1"));
    assert!(head.contains("content-type: application/x-www-form-urlencoded"));

    // Form-encoded query carrying the window predicate
    assert!(form.starts_with("query="));
    assert!(form.contains("FILTER%28%21BOUND%28%3Finception%29%29"));
    assert!(form.contains("Q3305213"));
}

#[tokio::test]
async fn test_http_error_carries_truncated_body() {
    const LONG_BODY: &str = concat!(
        "java.util.concurrent.TimeoutException ",
        "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
        "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
        "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
        "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
        "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
        "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
    );
    let (endpoint, _requests) = spawn_server(Some((500, LONG_BODY))).await;

    let err = client(endpoint, Duration::from_secs(5))
        .execute("FILTER(YEAR(?inception) < 1400)")
        .await
        .unwrap_err();

    match err {
        QueryError::Http { status, body } => {
            assert_eq!(status, 500);
            assert!(body.starts_with("java.util.concurrent.TimeoutException"));
            assert_eq!(body.chars().count(), 500);
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_protocol_error() {
    let (endpoint, _requests) = spawn_server(Some((200, "<html>Service Unavailable</html>"))).await;

    let err = client(endpoint, Duration::from_secs(5))
        .execute("FILTER(!BOUND(?inception))")
        .await
        .unwrap_err();

    match err {
        QueryError::Protocol { body, .. } => assert!(body.contains("Service Unavailable")),
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_silent_endpoint_times_out() {
    let (endpoint, _requests) = spawn_server(None).await;

    let started = std::time::Instant::now();
    let err = client(endpoint, Duration::from_millis(300))
        .execute("FILTER(!BOUND(?inception))")
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Timeout(d) if d == Duration::from_millis(300)));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{}/sparql", addr), Duration::from_secs(5))
        .execute("FILTER(!BOUND(?inception))")
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Network(_)));
}
