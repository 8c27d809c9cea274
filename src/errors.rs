/*!
 * Error types for the captrace library.
 *
 * This module contains custom error types for the caption pipeline,
 * using the thiserror crate for ergonomic error definitions.
 *
 * None of these errors is fatal to a caption session: the provider
 * degrades to scrape-only mode when the structured track cannot be
 * acquired, and malformed page state simply falls through to the next
 * discovery strategy.
 */

use thiserror::Error;

/// Errors that can occur while resolving a caption track from page state
#[derive(Error, Debug)]
pub enum TrackError {
    /// No caption tracks could be discovered by any strategy
    #[error("no caption tracks found in page state")]
    NoTracks,

    /// Tracks were found but none carried a fetchable base URL
    #[error("no usable base URL on any resolved track")]
    NoBaseUrl,
}

/// Errors that can occur while fetching or decoding a structured track payload
#[derive(Error, Debug)]
pub enum FetchError {
    /// The HTTP request itself failed (connection, timeout)
    #[error("track request failed: {0}")]
    RequestFailed(String),

    /// The server answered with a non-success status
    #[error("track request returned status {status}")]
    BadStatus {
        /// HTTP status code
        status: u16,
    },

    /// The payload could not be decoded into caption events
    #[error("failed to parse track payload: {0}")]
    ParseError(String),

    /// The payload decoded but contained no caption events
    #[error("track payload contained no caption events")]
    EmptyPayload,

    /// All scheduled attempts were used without a usable payload
    #[error("track fetch exhausted {attempts} attempts")]
    Exhausted {
        /// Number of attempts made
        attempts: usize,
    },

    /// The session was restarted while this attempt was in flight.
    /// Expected during navigation, never logged above debug level.
    #[error("fetch result discarded: session generation changed")]
    StaleGeneration,
}

/// Top-level error type wrapping the caption pipeline stages
#[derive(Error, Debug)]
pub enum CaptionError {
    /// Error from track resolution
    #[error("track error: {0}")]
    Track(#[from] TrackError),

    /// Error from the track fetcher
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Error from configuration handling
    #[error("config error: {0}")]
    Config(String),
}

impl From<anyhow::Error> for CaptionError {
    fn from(error: anyhow::Error) -> Self {
        Self::Config(error.to_string())
    }
}

impl FetchError {
    /// Whether a retry attempt may succeed where this one failed.
    /// Stale generations are never retried: the session that wanted
    /// the result is gone.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::BadStatus { .. } => true,
            Self::ParseError(_) | Self::EmptyPayload => true,
            Self::Exhausted { .. } | Self::StaleGeneration => false,
        }
    }
}
