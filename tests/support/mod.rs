#![allow(dead_code)]

use activity_photo_cam::{
    cache::RotatingImageCache,
    config::PhotosConfig,
    fetcher::HttpImageFetcher,
};
use axum::{Router, http::StatusCode, routing::get};
use chrono::{TimeZone, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Minimal PNG header, enough for content sniffing
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";
pub const PLACEHOLDER_BYTES: &[u8] = b"GIF89a placeholder";

/// Local image host used in place of the activity CDN
pub struct ImageServer {
    addr: SocketAddr,
}

impl ImageServer {
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/photos/{name}", get(serve_photo))
            .route("/placeholder.gif", get(|| async { PLACEHOLDER_BYTES }))
            .route(
                "/slow.png",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    PNG_BYTES
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn photo(&self, name: &str) -> String {
        self.url(&format!("/photos/{name}"))
    }
}

/// Photos whose name starts with `missing` answer 404
async fn serve_photo(
    axum::extract::Path(name): axum::extract::Path<String>,
) -> Result<&'static [u8], StatusCode> {
    if name.starts_with("missing") {
        Err(StatusCode::NOT_FOUND)
    } else {
        Ok(PNG_BYTES)
    }
}

pub fn fetcher(timeout: Duration) -> Arc<HttpImageFetcher> {
    Arc::new(HttpImageFetcher::with_timeout(timeout, "activity-photo-cam-tests").unwrap())
}

pub fn photos_config(temp_dir: &TempDir, server: &ImageServer, max_images: usize) -> PhotosConfig {
    PhotosConfig {
        max_images,
        default_image_url: server.url("/placeholder.gif"),
        snapshot_path: temp_dir.path().join("img_urls.json"),
        ..PhotosConfig::default()
    }
}

pub fn open_cache(temp_dir: &TempDir, server: &ImageServer, max_images: usize) -> Arc<RotatingImageCache> {
    Arc::new(
        RotatingImageCache::open(
            &photos_config(temp_dir, server, max_images),
            fetcher(Duration::from_secs(2)),
        )
        .unwrap(),
    )
}

pub fn at(seconds: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).unwrap()
}
