//! Image downloads for result cards.
//!
//! Each image is stored as `image_<n>.jpeg` in the asset directory. `n` comes
//! from a run-scoped counter that is bumped *before* the download starts.
//! Identifiers therefore increase in the order downloads are requested and are
//! never reused, even when a download fails.
//!
//! A failed download is logged and reported as [`DOWNLOAD_FAILED`]. It never
//! propagates. Each URL gets a single attempt with no retry.

use crate::models::DOWNLOAD_FAILED;
use std::error::Error;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, instrument, warn};
use url::Url;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads card images into a local directory under sequential names.
#[derive(Debug)]
pub struct AssetFetcher {
    client: reqwest::Client,
    dir: PathBuf,
    /// Relative image URLs are resolved against this.
    base: Option<Url>,
    counter: AtomicU64,
    failures: AtomicUsize,
}

impl AssetFetcher {
    /// Create a fetcher writing into `dir`. The directory is created on first use.
    pub fn new(dir: impl Into<PathBuf>, base: Option<Url>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            dir: dir.into(),
            base,
            counter: AtomicU64::new(0),
            failures: AtomicUsize::new(0),
        })
    }

    /// Number of downloads that failed so far in this run.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// Reserve the next identifier and download `url` under it.
    ///
    /// The identifier is taken when this is called, not when the future is
    /// first polled. Callers that start several downloads at once get
    /// identifiers in call order.
    ///
    /// Resolves to the local file name on success or [`DOWNLOAD_FAILED`].
    pub fn fetch(&self, url: String) -> impl Future<Output = String> + '_ {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let local_id = format!("image_{n}.jpeg");

        async move {
            match self.download(&url, &local_id).await {
                Ok(bytes) => {
                    debug!(%url, %local_id, bytes, "Saved image");
                    local_id
                }
                Err(e) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(%url, %local_id, error = %e, "Image download failed");
                    DOWNLOAD_FAILED.to_string()
                }
            }
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn download(&self, url: &str, local_id: &str) -> Result<usize, Box<dyn Error>> {
        let resolved = match &self.base {
            Some(base) => base.join(url)?,
            None => Url::parse(url)?,
        };

        let bytes = self
            .client
            .get(resolved)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        fs::create_dir_all(&self.dir).await?;
        fs::write(self.dir.join(local_id), &bytes).await?;
        Ok(bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn image_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photo.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_fetch_writes_file_and_creates_dir() {
        let server = image_server().await;
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("images");
        let fetcher = AssetFetcher::new(&dir, None).unwrap();

        let id = fetcher.fetch(format!("{}/photo.jpg", server.uri())).await;

        assert_eq!(id, "image_1.jpeg");
        let saved = std::fs::read(dir.join("image_1.jpeg")).unwrap();
        assert_eq!(saved, vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(fetcher.failures(), 0);
    }

    #[tokio::test]
    async fn test_http_error_yields_sentinel() {
        let server = image_server().await;
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = AssetFetcher::new(tmp.path(), None).unwrap();

        let id = fetcher.fetch(format!("{}/missing.jpg", server.uri())).await;

        assert_eq!(id, "Download failed");
        assert_eq!(fetcher.failures(), 1);
        assert!(!tmp.path().join("image_1.jpeg").exists());
    }

    #[tokio::test]
    async fn test_ids_increase_across_failures() {
        let server = image_server().await;
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = AssetFetcher::new(tmp.path(), None).unwrap();

        let first = fetcher.fetch(format!("{}/photo.jpg", server.uri())).await;
        let failed = fetcher.fetch("not a url".to_string()).await;
        let third = fetcher.fetch(format!("{}/photo.jpg", server.uri())).await;

        assert_eq!(first, "image_1.jpeg");
        assert_eq!(failed, "Download failed");
        assert_eq!(third, "image_3.jpeg");
        assert!(!tmp.path().join("image_2.jpeg").exists());
    }

    #[tokio::test]
    async fn test_ids_follow_call_order_when_concurrent() {
        let server = image_server().await;
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = AssetFetcher::new(tmp.path(), None).unwrap();

        let a = fetcher.fetch(format!("{}/photo.jpg", server.uri()));
        let b = fetcher.fetch(format!("{}/photo.jpg", server.uri()));
        let (b_id, a_id) = tokio::join!(b, a);

        assert_eq!(a_id, "image_1.jpeg");
        assert_eq!(b_id, "image_2.jpeg");
    }

    #[tokio::test]
    async fn test_relative_url_resolves_against_base() {
        let server = image_server().await;
        let tmp = tempfile::tempdir().unwrap();
        let base = Url::parse(&server.uri()).unwrap();
        let fetcher = AssetFetcher::new(tmp.path(), Some(base)).unwrap();

        let id = fetcher.fetch("/photo.jpg".to_string()).await;

        assert_eq!(id, "image_1.jpeg");
        assert!(tmp.path().join("image_1.jpeg").exists());
    }
}
