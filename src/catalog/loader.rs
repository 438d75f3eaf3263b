use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;

use crate::catalog::error::CatalogError;
use crate::catalog::parser::{parse_catalog, ElementCatalog};

/// Progress callback: `(bytes_loaded, bytes_total)`.
pub type ProgressFn = Box<dyn FnMut(u64, Option<u64>) + Send + 'static>;

type LoadResult = Result<ElementCatalog, CatalogError>;

/// Where a TLE text resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TleSource {
    Http(String),
    File(PathBuf),
}

impl FromStr for TleSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(TleSource::Http(s.to_string()))
        } else if let Some(path) = s.strip_prefix("file://") {
            Ok(TleSource::File(PathBuf::from(path)))
        } else {
            Ok(TleSource::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for TleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TleSource::Http(url) => write!(f, "{}", url),
            TleSource::File(path) => write!(f, "file://{}", path.display()),
        }
    }
}

/// Pending result of one `TleLoader::load` call.
#[derive(Debug)]
pub struct LoadHandle {
    id: u64,
    rx: oneshot::Receiver<LoadResult>,
    superseded: Arc<AtomicBool>,
}

impl LoadHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Non-blocking poll. `None` while the fetch is still running.
    pub fn try_take(&mut self) -> Option<LoadResult> {
        if self.is_superseded() {
            return Some(Err(CatalogError::Cancelled));
        }
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(CatalogError::Cancelled)),
        }
    }

    pub async fn wait(self) -> LoadResult {
        let result = self.rx.await.unwrap_or(Err(CatalogError::Cancelled));
        if self.superseded.load(Ordering::Acquire) {
            return Err(CatalogError::Cancelled);
        }
        result
    }

    fn is_superseded(&self) -> bool {
        self.superseded.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct InFlight {
    id: u64,
    join: JoinHandle<()>,
    superseded: Arc<AtomicBool>,
}

/// Fetches TLE catalogs with at most one request outstanding.
pub struct TleLoader {
    client: reqwest::Client,
    current: Option<InFlight>,
    next_id: u64,
}

impl TleLoader {
    pub fn new() -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Client(e.to_string()))?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            current: None,
            next_id: 0,
        }
    }

    /// Start loading `source`, aborting any load still in flight.
    ///
    /// Must be called from within a tokio runtime. The returned handle
    /// resolves exactly once. Once superseded by another `load`, a `cancel`
    /// or dropping the loader, the handle resolves to
    /// `CatalogError::Cancelled`, even when its fetch had already finished.
    pub fn load(&mut self, source: TleSource, progress: Option<ProgressFn>) -> LoadHandle {
        self.cancel();

        self.next_id += 1;
        let id = self.next_id;
        let (tx, rx) = oneshot::channel();
        let client = self.client.clone();
        let superseded = Arc::new(AtomicBool::new(false));

        log::info!("Loading TLE catalog #{} from {}", id, source);

        let join = tokio::spawn(async move {
            let result = fetch_text(&client, &source, progress).await.map(|text| {
                let outcome = parse_catalog(&text);
                log::info!(
                    "Parsed {} TLE records from {} ({} skipped)",
                    outcome.catalog.len(),
                    source,
                    outcome.issues.len()
                );
                outcome.catalog
            });

            if let Err(e) = &result {
                log::warn!("TLE load from {} failed: {}", source, e);
            }

            // Receiver may be gone if the caller dropped the handle.
            let _ = tx.send(result);
        });

        self.current = Some(InFlight {
            id,
            join,
            superseded: superseded.clone(),
        });
        LoadHandle { id, rx, superseded }
    }

    /// Abort the latest load. Its handle resolves to `Cancelled` even if
    /// the result was already delivered but not yet taken.
    pub fn cancel(&mut self) {
        if let Some(in_flight) = self.current.take() {
            in_flight.superseded.store(true, Ordering::Release);
            if !in_flight.join.is_finished() {
                log::debug!("Aborting TLE load #{}", in_flight.id);
                in_flight.join.abort();
            }
        }
    }

    pub fn in_flight(&self) -> bool {
        self.current
            .as_ref()
            .map(|f| !f.join.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for TleLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn fetch_text(
    client: &reqwest::Client,
    source: &TleSource,
    mut progress: Option<ProgressFn>,
) -> Result<String, CatalogError> {
    match source {
        TleSource::Http(url) => {
            let mut response = client.get(url).send().await?;

            if !response.status().is_success() {
                return Err(CatalogError::HttpStatus {
                    url: url.clone(),
                    status: response.status().as_u16(),
                });
            }

            let total = response.content_length();
            let mut body = Vec::new();
            while let Some(chunk) = response.chunk().await? {
                body.extend_from_slice(&chunk);
                if let Some(report) = progress.as_mut() {
                    report(body.len() as u64, total);
                }
            }

            Ok(String::from_utf8_lossy(&body).into_owned())
        }
        TleSource::File(path) => {
            let bytes = tokio::fs::read(path).await?;
            if let Some(report) = progress.as_mut() {
                let len = bytes.len() as u64;
                report(len, Some(len));
            }
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
