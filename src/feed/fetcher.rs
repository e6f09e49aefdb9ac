use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use crate::feed::document::{parse_document, DocumentError};
use crate::feed::extractor::{extract, ExtractError, Extraction, Vocabulary};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching the raw feed document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Failure of a full fetch-and-extract cycle.
///
/// Callers can tell transport problems, malformed documents, and a feed with
/// the wrong shape apart instead of inferring failure from an empty list.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The document could not be retrieved.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The retrieved bytes were not a parseable XML document.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// The document parsed but is not the expected feed shape.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Fetches the feed document and extracts its normalized entries.
///
/// Performs one HTTP GET (no retries), builds the document tree, and runs
/// entry extraction. Entry-level problems do not surface here; they are in
/// [`Extraction::dropped`].
///
/// # Errors
///
/// Returns [`FeedError`] distinguishing fetch, document-parse, and
/// extraction failures. All three mean "could not process the feed this
/// cycle", as opposed to an `Ok` with zero entries.
pub async fn fetch_entries(
    client: &reqwest::Client,
    url: &str,
    vocabulary: &Vocabulary,
    fallback_link: &str,
) -> Result<Extraction, FeedError> {
    let bytes = fetch_bytes(client, url).await?;
    let document = parse_document(&bytes)?;
    let extraction = extract(&document, vocabulary, fallback_link)?;

    if !extraction.dropped.is_empty() {
        tracing::warn!(
            feed = %url,
            dropped = extraction.dropped.len(),
            "Malformed entries skipped"
        );
    }

    Ok(extraction)
}

/// Fetches the raw feed bytes with a timeout and a body size cap.
pub async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = tokio::time::timeout(FETCH_TIMEOUT, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    read_limited_bytes(response, MAX_FEED_SIZE).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for the completeness check
    let expected_length = response.content_length();

    // Fast path: reject oversized bodies before streaming
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    // A short body means the connection dropped mid-transfer; surface that
    // rather than handing truncated XML to the parser.
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
