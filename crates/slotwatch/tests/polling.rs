//! Polling engine integration tests against a local mock server.

use flate2::write::GzEncoder;
use flate2::Compression;
use slotwatch::{
    build_request, Archive, OutboundRequest, Pair, PollState, Poller, PollerConfig, Request,
    WatchError,
};
use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHECKOUT_PATH: &str = "/checkout/enter-checkout";

// ─────────────────────── helpers ───────────────────────

fn page_with(labels: &[&str]) -> String {
    let slots: String = labels
        .iter()
        .map(|l| {
            format!(
                r#"<span class="a-radio-label"><span data-testid="w" class="a-color-base">{l}</span></span>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="delivery-window-radio-button-section">{slots}</div></body></html>"#
    )
}

fn checkout_request(server: &MockServer) -> OutboundRequest {
    let entry = Request {
        method: "GET".to_string(),
        url: format!("{}{CHECKOUT_PATH}?merchantId=A1", server.uri()),
        headers: vec![
            Pair::new(":authority", "localhost"),
            Pair::new("x-session", "abc"),
            Pair::new("accept", "text/html"),
        ],
        cookies: vec![Pair::new("session-id", "dropped")],
        query_string: vec![Pair::new("merchantId", "A1")],
    };
    build_request(&entry).unwrap()
}

fn poller(interval: Duration) -> Poller {
    Poller::new(PollerConfig {
        interval,
        timeout: Duration::from_secs(5),
        ..PollerConfig::default()
    })
    .unwrap()
}

async fn mount_page(server: &MockServer, labels: &[&str]) {
    Mock::given(method("GET"))
        .and(path(CHECKOUT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_with(labels)))
        .mount(server)
        .await;
}

// ═══════════════════════ single check ═══════════════════════

#[tokio::test]
async fn test_check_once_replays_headers_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CHECKOUT_PATH))
        .and(query_param("merchantId", "A1"))
        .and(header("x-session", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_with(&["Today 2PM - 4PM"])))
        .mount(&server)
        .await;

    let result = poller(Duration::from_secs(60))
        .check_once(&checkout_request(&server))
        .await
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.windows[0].label(), "Today 2PM - 4PM");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("cookie").is_none());
    assert_eq!(received[0].url.query(), Some("merchantId=A1"));
}

#[tokio::test]
async fn test_check_once_decompresses_gzip() {
    let server = MockServer::start().await;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(page_with(&["A", "B", "C", "D"]).as_bytes())
        .unwrap();
    let gz = encoder.finish().unwrap();

    Mock::given(method("GET"))
        .and(path(CHECKOUT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_bytes(gz),
        )
        .mount(&server)
        .await;

    let result = poller(Duration::from_secs(60))
        .check_once(&checkout_request(&server))
        .await
        .unwrap();
    assert_eq!(result.len(), 4);
}

#[tokio::test]
async fn test_check_once_error_status_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = poller(Duration::from_secs(60))
        .check_once(&checkout_request(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::Transport(_)));
}

#[tokio::test]
async fn test_check_once_writes_page_dump() {
    let server = MockServer::start().await;
    mount_page(&server, &["Tomorrow 8AM - 10AM"]).await;
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("debug.html");

    let poller = Poller::new(PollerConfig {
        dump_html: Some(dump.clone()),
        ..PollerConfig::default()
    })
    .unwrap();
    poller.check_once(&checkout_request(&server)).await.unwrap();

    let written = std::fs::read_to_string(&dump).unwrap();
    assert!(written.contains("Tomorrow 8AM - 10AM"));
}

// ═══════════════════════ sessions ═══════════════════════

#[tokio::test]
async fn test_cancel_after_first_result_closes_stream() {
    let server = MockServer::start().await;
    mount_page(&server, &["Today 2PM - 4PM", "Today 4PM - 6PM"]).await;

    let mut handle = poller(Duration::from_secs(60)).start(checkout_request(&server));

    let first = tokio::time::timeout(Duration::from_secs(5), handle.results().next())
        .await
        .expect("first check runs immediately")
        .expect("stream open")
        .unwrap();
    assert_eq!(first.len(), 2);

    handle.cancel();
    let after = tokio::time::timeout(Duration::from_secs(2), handle.results().next())
        .await
        .expect("stream should close promptly");
    assert!(after.is_none());
    assert_eq!(handle.state(), PollState::Cancelled);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_repeats_on_each_tick() {
    let server = MockServer::start().await;
    mount_page(&server, &[]).await;

    let mut handle = poller(Duration::from_millis(50)).start(checkout_request(&server));
    for _ in 0..3 {
        let result = tokio::time::timeout(Duration::from_secs(5), handle.results().next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(result.is_empty());
    }
    handle.stop().await;

    assert!(server.received_requests().await.unwrap().len() >= 3);
}

#[tokio::test]
async fn test_cancel_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page_with(&["late"]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut handle = poller(Duration::from_secs(60)).start(checkout_request(&server));
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.cancel();

    let after = tokio::time::timeout(Duration::from_secs(1), handle.results().next())
        .await
        .expect("cancellation should not wait for the slow response");
    assert!(after.is_none());
}

#[tokio::test]
async fn test_transport_failures_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_page(&server, &["Today 6PM - 8PM"]).await;

    let mut handle = poller(Duration::from_millis(30)).start(checkout_request(&server));
    let result = tokio::time::timeout(Duration::from_secs(5), handle.results().next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(result.windows[0].label(), "Today 6PM - 8PM");
    assert!(server.received_requests().await.unwrap().len() >= 3);
    handle.stop().await;
}

#[tokio::test]
async fn test_page_parse_failure_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfe, 0xfd, 0x00]))
        .mount(&server)
        .await;

    let mut handle = poller(Duration::from_millis(30)).start(checkout_request(&server));
    let item = tokio::time::timeout(Duration::from_secs(5), handle.results().next())
        .await
        .unwrap()
        .expect("fatal error is delivered on the stream");
    assert!(matches!(item, Err(WatchError::PageParse(_))));

    let after = tokio::time::timeout(Duration::from_secs(2), handle.results().next())
        .await
        .unwrap();
    assert!(after.is_none());
    assert_eq!(handle.state(), PollState::Cancelled);
}

#[tokio::test]
async fn test_dropping_stream_stops_task() {
    let server = MockServer::start().await;
    mount_page(&server, &["x"]).await;

    let handle = poller(Duration::from_millis(20)).start(checkout_request(&server));
    let (results, cancel) = handle.into_parts();
    drop(results);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let seen = server.received_requests().await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), seen);
    assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn test_dropping_stream_stops_failing_task() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let handle = poller(Duration::from_millis(20)).start(checkout_request(&server));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!server.received_requests().await.unwrap().is_empty());

    drop(handle);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let seen = server.received_requests().await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), seen);
}

#[tokio::test]
async fn test_start_polling_from_archive() {
    let server = MockServer::start().await;
    mount_page(&server, &["Today 2PM - 4PM"]).await;

    let har = format!(
        r#"{{"log": {{"entries": [{{"request": {{
            "method": "GET",
            "url": "{}{CHECKOUT_PATH}",
            "headers": [], "cookies": [], "queryString": []
        }}}}]}}}}"#,
        server.uri()
    );
    let archive = Archive::parse(har.as_bytes()).unwrap();
    let source = slotwatch::find_checkout_request(&archive, CHECKOUT_PATH).unwrap();
    let request = build_request(source).unwrap();

    let mut handle = slotwatch::start_polling(Duration::from_secs(60), request).unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), handle.results().next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(first.len(), 1);
    handle.stop().await;
}
