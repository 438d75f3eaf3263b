use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("TLE fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("TLE fetch from {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("TLE file read error: {0}")]
    Read(#[from] std::io::Error),
    #[error("Malformed TLE text at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Invalid TLE for {name}: {message}")]
    InvalidTle { name: String, message: String },
    #[error("TLE load superseded or cancelled")]
    Cancelled,
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl CatalogError {
    /// Transport-level failures: the load produced no catalog at all.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            CatalogError::Fetch(_) | CatalogError::HttpStatus { .. } | CatalogError::Read(_)
        )
    }
}
