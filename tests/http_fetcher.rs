mod support;

use activity_photo_cam::errors::FetchError;
use activity_photo_cam::fetcher::ImageFetcher;
use std::time::Duration;
use support::{ImageServer, PNG_BYTES, fetcher};

#[tokio::test]
async fn test_fetch_returns_image_bytes() {
    let server = ImageServer::start().await;
    let fetcher = fetcher(Duration::from_secs(2));

    let bytes = fetcher.fetch(&server.photo("ride.png")).await.unwrap();

    assert_eq!(&bytes[..], PNG_BYTES);
}

#[tokio::test]
async fn test_check_accepts_success_status() {
    let server = ImageServer::start().await;
    let fetcher = fetcher(Duration::from_secs(2));

    assert!(fetcher.check(&server.photo("ride.png")).await.is_ok());
}

#[tokio::test]
async fn test_not_found_maps_to_status_error() {
    let server = ImageServer::start().await;
    let fetcher = fetcher(Duration::from_secs(2));
    let url = server.photo("missing.png");

    let err = fetcher.check(&url).await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert_eq!(err.url(), url);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = ImageServer::start().await;
    let fetcher = fetcher(Duration::from_millis(200));

    let err = fetcher.fetch(&server.url("/slow.png")).await.unwrap_err();

    assert!(matches!(err, FetchError::Timeout { .. }));
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() {
    // Bind and drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = fetcher(Duration::from_secs(2));
    let err = fetcher
        .check(&format!("http://{addr}/photo.png"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Transport { .. }));
}
