//! Typed errors for the scraping pipeline.
//!
//! Only [`ScrapeError`] ever reaches the caller. Per-listing and per-record
//! failures are logged and absorbed into the records themselves.

use std::time::Duration;

use thiserror::Error;

/// Fatal errors that abort a collection run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// None of the search input selectors matched
    #[error("search input not found (tried {tried:?})")]
    SearchInputNotFound { tried: Vec<String> },

    /// The result feed never rendered after submitting the search
    #[error("result feed did not appear within {waited:?}")]
    FeedNotFound { waited: Duration },

    /// Target result count must be at least one
    #[error("invalid target count: {0}")]
    InvalidTarget(usize),

    /// The render engine failed while driving the search
    #[error("render engine error: {0}")]
    Render(#[from] RenderError),
}

/// Errors raised by a render-engine session.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Browser process could not be started
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// Navigation failed or timed out
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// DevTools protocol command failed
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Selector matched nothing where an element was required
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },
}

/// Errors from a reverse-geocoding lookup.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Request could not be sent or timed out
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("geocoder returned status {0}")]
    Status(u16),

    /// Service reported an error in the body (e.g. "Unable to geocode")
    #[error("geocoder error: {0}")]
    Service(String),

    /// Invalid service URL
    #[error("invalid geocoder URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Errors from a classification request.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Upstream API failure
    #[error("{0}")]
    Api(#[from] openai_client::OpenAIError),

    /// The service answered with no content
    #[error("Empty response from completion service")]
    EmptyResponse,

    /// Content was not valid JSON
    #[error("Invalid JSON (at line {line}, column {column}): {message}")]
    Json {
        message: String,
        line: usize,
        column: usize,
    },

    /// JSON parsed but was not an object
    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// Mock or custom services
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for CompletionError {
    fn from(e: serde_json::Error) -> Self {
        let full = e.to_string();
        let message = full
            .split(" at line ")
            .next()
            .unwrap_or(full.as_str())
            .to_string();
        CompletionError::Json {
            message,
            line: e.line(),
            column: e.column(),
        }
    }
}

/// Result type alias for pipeline setup operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for render-engine operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Result type alias for geocoding operations.
pub type GeocodeResult<T> = std::result::Result<T, GeocodeError>;

/// Result type alias for completion operations.
pub type CompletionResult<T> = std::result::Result<T, CompletionError>;
