//! HTTP client for PageKit
//!
//! This module provides the entry points for fetching a page. A fetch is a
//! single GET with a fixed timeout; only a 200 response is handed to the
//! [`extract`](crate::extract()) state machine.

use crate::error::FetchError;
use crate::extract::extract;
use crate::types::Document;
use crate::DEFAULT_USER_AGENT;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Timeout covering connect, response headers and body
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetch options
///
/// Only the User-Agent is meant to vary between callers. Every fetch runs
/// under [`DEFAULT_TIMEOUT`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Custom User-Agent
    pub user_agent: Option<String>,
    /// Test hook for exercising the timeout path without a 5 second wait.
    /// Not part of the supported API; leave it at [`DEFAULT_TIMEOUT`].
    #[doc(hidden)]
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Fetch a page and extract its text and metadata
///
/// Uses [`FetchOptions::default`]. For a custom User-Agent, use
/// [`fetch_with_options`].
pub async fn fetch(url: &str) -> Result<Document, FetchError> {
    fetch_with_options(url, &FetchOptions::default()).await
}

/// Fetch a page with custom options
///
/// Any transport failure or a status other than 200 is returned as an
/// error and no document is produced. A body that breaks off midway is not
/// an error: extraction runs on the bytes that arrived.
pub async fn fetch_with_options(url: &str, options: &FetchOptions) -> Result<Document, FetchError> {
    let target = parse_url(url)?;

    // Build headers
    let mut headers = HeaderMap::new();
    let user_agent = options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html, application/xhtml+xml, */*;q=0.8"),
    );

    // Build client
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(options.timeout)
        .timeout(options.timeout)
        .build()
        .map_err(FetchError::ClientBuild)?;

    debug!(url = %target, "Fetching page");
    let response = client
        .get(target)
        .send()
        .await
        .map_err(FetchError::from_reqwest)?;

    let status = response.status();
    if status != StatusCode::OK {
        warn!(url, status = status.as_u16(), "Page returned unexpected status");
        return Err(FetchError::UnexpectedStatus {
            code: status.as_u16(),
        });
    }

    let chunks = read_body(response).await;
    let mut document = extract(chunks.iter().flat_map(|chunk| chunk.iter().copied()));
    document.url = url.to_string();
    document.meta.status_code = status.as_u16();

    debug!(url, text_len = document.text.len(), "Page extracted");
    Ok(document)
}

/// Validate that `url` is an absolute http(s) URL
fn parse_url(url: &str) -> Result<Url, FetchError> {
    if url.is_empty() {
        return Err(FetchError::MissingUrl);
    }

    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl)?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(FetchError::InvalidUrl),
    }
}

/// Read the response body chunk by chunk
///
/// A read error (including the client timeout firing mid-body) ends the
/// body; the chunks received so far are kept.
/// Extraction only starts once this returns.
async fn read_body(response: reqwest::Response) -> Vec<Bytes> {
    let mut chunks = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => chunks.push(bytes),
            Err(e) => {
                warn!("Error reading body chunk, extracting partial content: {}", e);
                break;
            }
        }
    }

    chunks
}
