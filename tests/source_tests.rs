use std::fs;

use indegors::{
    source::{fetch_outline, HttpPopularitySource, PopularitySource, SourceError},
    station::StationParseError,
    time_window::TimeWindow,
};
use reqwest::Client;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};

fn read_mock_data(name: &str) -> String {
    fs::read_to_string(format!("mock/{}", name)).unwrap()
}

/// Answers a single request with `status` and `body`. The handle yields the request head.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let read = stream.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..read]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();

        String::from_utf8_lossy(&request).to_string()
    });

    (format!("http://{address}"), handle)
}

#[tokio::test]
async fn fetch_popularity() {
    let (base, server) = serve_once("200 OK", read_mock_data("popularity.json")).await;
    let source = HttpPopularitySource::new(&format!("{base}/get_popularity"));

    let records = source.fetch(TimeWindow::new(8, 9).unwrap()).await.unwrap();
    assert_eq!(records.len(), 9);
    assert!(records.iter().any(|r| r.is_virtual()));

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /get_popularity?start_hour=8&end_hour=9 HTTP/1.1"));
}

#[tokio::test]
async fn rejected_window_is_a_status_error() {
    let body = r#"{"error": "start_hour must be less than end_hour"}"#.to_string();
    let (base, server) = serve_once("400 Bad Request", body.clone()).await;
    let source = HttpPopularitySource::new(&format!("{base}/get_popularity"));

    let result = source.fetch(TimeWindow::new(8, 9).unwrap()).await;
    assert_eq!(result, Err(SourceError::Status { status: 400, body }));
    server.await.unwrap();
}

#[tokio::test]
async fn malformed_popularity_payload() {
    let (base, server) = serve_once("200 OK", r#"{"rows": []}"#.to_string()).await;
    let source = HttpPopularitySource::new(&format!("{base}/get_popularity"));

    let result = source.fetch(TimeWindow::default()).await;
    assert!(matches!(
        result,
        Err(SourceError::Payload(StationParseError::InvalidPayload(_)))
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn fetch_reference_outline() {
    let (base, server) =
        serve_once("200 OK", read_mock_data("philadelphia_outline.geojson")).await;

    let outline = fetch_outline(&Client::new(), &format!("{base}/philadelphia.geojson"))
        .await
        .unwrap();
    assert!(!outline.overlay().features.is_empty());
    assert!(outline.bbox().min().x < -75.2);
    assert!(outline.bbox().max().y > 40.1);

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /philadelphia.geojson HTTP/1.1"));
}

#[tokio::test]
async fn missing_outline_is_a_status_error() {
    let (base, server) = serve_once("404 Not Found", "not found".to_string()).await;

    let result = fetch_outline(&Client::new(), &format!("{base}/missing.geojson")).await;
    assert!(matches!(result, Err(SourceError::Status { status: 404, .. })));
    server.await.unwrap();
}
