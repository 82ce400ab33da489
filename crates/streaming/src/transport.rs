//! Fetch transports: where payload bytes come from.
//!
//! The loader only needs "fetch bytes for a URL"; the implementations here cover
//! HTTP(S), local files and in-memory payloads (tests, bundled data).

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use parking_lot::RwLock;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug)]
pub enum TransportError {
    /// The server answered with a non-success status.
    Status { url: String, status: u16 },
    /// The request could not be completed at all.
    Request { url: String, message: String },
    Io { path: PathBuf, source: std::io::Error },
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Status { status, .. } => write!(f, "HTTP error! status: {status}"),
            TransportError::Request { url, message } => {
                write!(f, "request to {url} failed: {message}")
            }
            TransportError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Fetches the raw payload behind a URL.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait Transport: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, TransportError>>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, TransportError>> {
        (**self).fetch(url)
    }
}

/// HTTP(S) transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, TransportError>> {
        Box::pin(async move {
            let request_err = |e: reqwest::Error| TransportError::Request {
                url: url.to_string(),
                message: e.to_string(),
            };

            let resp = self.client.get(url).send().await.map_err(request_err)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(TransportError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            resp.bytes().await.map_err(request_err)
        })
    }
}

/// Reads payloads from the local filesystem. Accepts plain paths and `file://` URLs.
#[derive(Debug, Clone, Default)]
pub struct FileTransport {
    root: Option<PathBuf>,
}

impl FileTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative paths against `root`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            // Site-absolute paths such as `/data/x.geojson` live under the root too.
            Some(root) => root.join(path.strip_prefix("/").unwrap_or(path)),
            None => path.to_path_buf(),
        }
    }
}

impl Transport for FileTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, TransportError>> {
        Box::pin(async move {
            let path = self.resolve(url);
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Bytes::from(data)),
                Err(source) => Err(TransportError::Io { path, source }),
            }
        })
    }
}

/// Routes `http://` / `https://` URLs to [`HttpTransport`] and everything else
/// to [`FileTransport`].
#[derive(Debug, Clone, Default)]
pub struct DefaultTransport {
    http: HttpTransport,
    files: FileTransport,
}

impl DefaultTransport {
    pub fn new(http: HttpTransport, files: FileTransport) -> Self {
        Self { http, files }
    }
}

impl Transport for DefaultTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, TransportError>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.http.fetch(url)
        } else {
            self.files.fetch(url)
        }
    }
}

#[derive(Debug, Clone)]
enum Canned {
    Body(Bytes),
    Status(u16),
}

/// In-memory payloads keyed by URL. Unknown URLs answer with status 404.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    entries: RwLock<HashMap<String, Canned>>,
    fetches: RwLock<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<Bytes>) {
        self.entries
            .write()
            .insert(url.into(), Canned::Body(body.into()));
    }

    pub fn insert_status(&self, url: impl Into<String>, status: u16) {
        self.entries.write().insert(url.into(), Canned::Status(status));
    }

    /// URLs fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetches.read().clone()
    }
}

impl Transport for MemoryTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Bytes, TransportError>> {
        self.fetches.write().push(url.to_string());
        let canned = self.entries.read().get(url).cloned();
        Box::pin(async move {
            match canned {
                Some(Canned::Body(body)) => Ok(body),
                Some(Canned::Status(status)) => Err(TransportError::Status {
                    url: url.to_string(),
                    status,
                }),
                None => Err(TransportError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        })
    }
}
