//! Asset fetch abstraction
//!
//! The cache never talks to the network or filesystem directly; it goes
//! through an [`AssetFetcher`]. `http(s)://` URLs are fetched with `reqwest`
//! (feature `http-assets`), everything else is read from disk relative to
//! an optional asset root.

use std::path::{Path, PathBuf};
#[cfg(feature = "http-assets")]
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::AssetError;

/// User agent for asset requests
#[cfg(feature = "http-assets")]
pub const USER_AGENT: &str = concat!("ambient-audio/", env!("CARGO_PKG_VERSION"));

/// Connection timeout in seconds
#[cfg(feature = "http-assets")]
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Whole-request timeout in seconds
#[cfg(feature = "http-assets")]
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Source of raw asset bytes
///
/// Implementations must be cheap to share: the cache holds one behind an
/// `Arc` and may call it concurrently for different URLs.
pub trait AssetFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>>;
}

/// Reads assets from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    /// Resolve paths as given (absolute, or relative to the working directory).
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Resolve site-relative URLs such as `/sounds/ui/click.wav` under `root`.
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = url.strip_prefix("file://").unwrap_or(url);
        match &self.root {
            Some(root) => root.join(path.trim_start_matches('/')),
            None => Path::new(path).to_path_buf(),
        }
    }
}

impl AssetFetcher for FileFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>> {
        let path = self.resolve(url);
        async move {
            tokio::fs::read(&path)
                .await
                .map_err(|err| AssetError::FetchFailed {
                    url: url.to_string(),
                    reason: format!("{}: {}", path.display(), err),
                })
        }
        .boxed()
    }
}

/// Fetches assets over HTTP(S)
#[cfg(feature = "http-assets")]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http-assets")]
impl HttpFetcher {
    pub fn new() -> Result<Self, AssetError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()
            .map_err(|err| AssetError::FetchFailed {
                url: String::new(),
                reason: format!("failed to build HTTP client: {}", err),
            })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http-assets")]
impl AssetFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>> {
        async move {
            let fetch_failed = |err: reqwest::Error| AssetError::FetchFailed {
                url: url.to_string(),
                reason: err.to_string(),
            };
            let response = self.client.get(url).send().await.map_err(fetch_failed)?;
            let status = response.status();
            if !status.is_success() {
                return Err(AssetError::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            let bytes = response.bytes().await.map_err(fetch_failed)?;
            Ok(bytes.to_vec())
        }
        .boxed()
    }
}

/// Dispatches on URL scheme: HTTP(S) to the network, anything else to disk
pub struct DefaultFetcher {
    #[cfg(feature = "http-assets")]
    http: Option<HttpFetcher>,
    file: FileFetcher,
}

impl DefaultFetcher {
    pub fn new(file: FileFetcher) -> Self {
        #[cfg(feature = "http-assets")]
        let http = match HttpFetcher::new() {
            Ok(http) => Some(http),
            Err(err) => {
                log::warn!("[AssetFetch] HTTP fetching unavailable: {}", err);
                None
            }
        };

        Self {
            #[cfg(feature = "http-assets")]
            http,
            file,
        }
    }
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self::new(FileFetcher::new())
    }
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl AssetFetcher for DefaultFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>> {
        if !is_http(url) {
            return self.file.fetch(url);
        }

        #[cfg(feature = "http-assets")]
        if let Some(http) = &self.http {
            return http.fetch(url);
        }

        async move {
            Err(AssetError::FetchFailed {
                url: url.to_string(),
                reason: "HTTP fetching is not available in this build".to_string(),
            })
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_root() {
        let fetcher = FileFetcher::with_root("/srv/site");
        assert_eq!(
            fetcher.resolve("/sounds/ui/click.wav"),
            PathBuf::from("/srv/site/sounds/ui/click.wav")
        );
        assert_eq!(
            fetcher.resolve("file://sounds/ambient/city.wav"),
            PathBuf::from("/srv/site/sounds/ambient/city.wav")
        );
    }

    #[test]
    fn test_resolve_without_root() {
        let fetcher = FileFetcher::new();
        assert_eq!(fetcher.resolve("/tmp/a.wav"), PathBuf::from("/tmp/a.wav"));
    }

    #[tokio::test]
    async fn test_file_fetch_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sounds")).unwrap();
        std::fs::write(dir.path().join("sounds/x.wav"), b"abc").unwrap();

        let fetcher = FileFetcher::with_root(dir.path());
        let bytes = fetcher.fetch("/sounds/x.wav").await.unwrap();
        assert_eq!(bytes, b"abc");
    }

    #[tokio::test]
    async fn test_file_fetch_missing_is_fetch_failed() {
        let fetcher = DefaultFetcher::new(FileFetcher::with_root("/nonexistent-root"));
        let result = fetcher.fetch("/sounds/ui/hover.wav").await;
        assert!(matches!(result, Err(AssetError::FetchFailed { .. })));
    }

    #[test]
    fn test_is_http() {
        assert!(is_http("https://cdn.example.org/a.wav"));
        assert!(is_http("http://localhost/a.wav"));
        assert!(!is_http("/sounds/a.wav"));
    }
}
