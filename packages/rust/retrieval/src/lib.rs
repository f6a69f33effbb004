//! Job posting retrieval: fetch a URL or read a file, reduce it to text.
//!
//! [`retrieve`] never fails. Problems come back inside the returned text as
//! `Error retrieving <locator>: <reason>` so the model reading it can say so.

mod convert;

use std::path::{Path, PathBuf};

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, instrument, warn};
use url::Url;

use cvtailor_shared::{Result, RetrievalConfig, TailorError};

pub use convert::{html_to_text, looks_like_html, truncate_chars};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Maximum response size we accept (5 MB).
const MAX_RESPONSE_SIZE: u64 = 5 * 1024 * 1024;

/// User-Agent string for retrieval requests.
const USER_AGENT: &str = concat!("cvtailor/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// Where a posting lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Remote(Url),
    File(PathBuf),
}

impl Locator {
    /// `http`/`https` URLs are remote; `file://` URLs and everything else are paths.
    pub fn parse(locator: &str) -> Self {
        let trimmed = locator.trim();
        match Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(url),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => Self::File(path),
                Err(()) => Self::File(PathBuf::from(trimmed)),
            },
            _ => Self::File(PathBuf::from(trimmed)),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// Shorthand for `Locator::parse(locator).is_remote()`.
pub fn is_remote(locator: &str) -> bool {
    Locator::parse(locator).is_remote()
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Fetch or read `locator` and return its text, truncated to `config.max_chars`.
#[instrument(skip(config), fields(max_chars = config.max_chars))]
pub async fn retrieve(locator: &str, config: &RetrievalConfig) -> String {
    let result = match Locator::parse(locator) {
        Locator::Remote(url) => fetch_url(&url, config).await,
        Locator::File(path) => read_file(&path).await,
    };

    match result {
        Ok(text) => {
            let text = truncate_chars(&text, config.max_chars);
            info!(chars = text.chars().count(), "posting retrieved");
            text
        }
        Err(e) => {
            warn!(error = %e, "retrieval failed");
            format!("Error retrieving {locator}: {e}")
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_client(config: &RetrievalConfig) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(config.timeout)
        .build()
        .map_err(|e| TailorError::Network(format!("failed to build HTTP client: {e}")))
}

async fn fetch_url(url: &Url, config: &RetrievalConfig) -> Result<String> {
    let client = build_client(config)?;
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| TailorError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TailorError::Network(format!("{url}: HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE {
            return Err(TailorError::validation(format!(
                "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response
        .text()
        .await
        .map_err(|e| TailorError::Network(format!("{url}: failed to read body: {e}")))?;
    debug!(bytes = body.len(), content_type = ?content_type, "response received");

    if looks_like_html(&body, content_type.as_deref()) {
        html_to_text(&body)
    } else {
        Ok(body)
    }
}

async fn read_file(path: &Path) -> Result<String> {
    let body = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TailorError::io(path, e))?;
    debug!(bytes = body.len(), path = %path.display(), "file read");

    let is_html_file = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));

    if is_html_file || looks_like_html(&body, None) {
        html_to_text(&body)
    } else {
        Ok(body)
    }
}
