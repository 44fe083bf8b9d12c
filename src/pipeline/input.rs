//! Input resolution: classify a user-supplied source string.
//!
//! ## Classification order
//!
//! 1. an existing **regular file** on the local file system,
//! 2. a string that parses as a **URL**,
//! 3. anything else is **inline markup**.
//!
//! The order is observable: a file literally named `https:/example.com` (or
//! any other URL-shaped name) that exists on disk resolves as a file.

use crate::error::Html2PdfError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// The classified origin of the HTML to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A local file; its contents are the page markup.
    File(PathBuf),
    /// A page to navigate to.
    Url(Url),
    /// The string itself is the markup.
    InlineHtml(String),
}

impl Source {
    /// Classify `input`. Never fails: inline markup is the catch-all.
    pub fn resolve(input: &str) -> Source {
        let path = Path::new(input);
        if !input.is_empty() && path.is_file() {
            debug!("Resolved source as local file: {}", path.display());
            return Source::File(path.to_path_buf());
        }
        if let Ok(url) = Url::parse(input) {
            debug!("Resolved source as URL: {}", url);
            return Source::Url(url);
        }
        debug!("Resolved source as inline markup ({} bytes)", input.len());
        Source::InlineHtml(input.to_string())
    }

    /// Short, human-readable kind name used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Source::File(_) => "file",
            Source::Url(_) => "url",
            Source::InlineHtml(_) => "inline",
        }
    }

    /// Read the markup for file sources so every strategy shares one copy.
    pub fn load(self) -> Result<LoadedSource, Html2PdfError> {
        let markup = match &self {
            Source::File(path) => {
                let bytes = std::fs::read(path).map_err(|e| Html2PdfError::SourceUnreadable {
                    path: path.clone(),
                    source: e,
                })?;
                info!("Loaded {} bytes of markup from {}", bytes.len(), path.display());
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            Source::InlineHtml(html) => Some(html.clone()),
            Source::Url(_) => None,
        };
        Ok(LoadedSource { source: self, markup })
    }
}

/// A classified source plus its markup, shared read-only by every strategy.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub source: Source,
    /// Page markup for file and inline sources; `None` for URLs.
    pub markup: Option<String>,
}

impl LoadedSource {
    /// Convenience: resolve and load in one step.
    pub fn from_input(input: &str) -> Result<LoadedSource, Html2PdfError> {
        Source::resolve(input).load()
    }

    /// The URL to navigate to, for URL sources.
    pub fn url(&self) -> Option<&Url> {
        match &self.source {
            Source::Url(u) => Some(u),
            _ => None,
        }
    }

    /// A URL the browser can open directly: the source URL, or a `file://`
    /// URL for file sources (so relative assets resolve). `None` for inline.
    pub fn navigable_url(&self) -> Option<Url> {
        match &self.source {
            Source::Url(u) => Some(u.clone()),
            Source::File(p) => std::fs::canonicalize(p)
                .ok()
                .and_then(|abs| Url::from_file_path(abs).ok()),
            Source::InlineHtml(_) => None,
        }
    }
}

/// Fetch the body of a URL source as text (best effort, for the text-only
/// fallback). Returns `None` on any network or HTTP error.
pub async fn fetch_text(url: &Url, timeout: Duration, user_agent: Option<&str>) -> Option<String> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let client = builder.build().ok()?;

    let response = match client.get(url.as_str()).send().await {
        Ok(r) => r,
        Err(e) => {
            debug!("Fetching {} failed: {}", url, e);
            return None;
        }
    };
    if !response.status().is_success() {
        debug!("Fetching {} returned HTTP {}", url, response.status());
        return None;
    }
    response.text().await.ok()
}
