//! yt-transcript - fetch the transcript of a YouTube video as a single JSON object
//!
//! The library resolves one caption track for a video (manual track in the preferred
//! language, then the auto-generated one, then whatever comes first), flattens its
//! fragments into plain text and renders the outcome as `{"success": ..}` JSON.

pub mod cli;
pub mod config;
pub mod output;
pub mod provider;
pub mod resolver;

pub use cli::Cli;
pub use config::Config;
pub use output::TranscriptResult;
pub use provider::{Fragment, TrackList, TrackOrigin, TranscriptProvider, TranscriptTrack};
pub use resolver::TranscriptResolver;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Reasons a transcript could not be produced.
///
/// Every variant carries the human-readable detail that ends up in the JSON `error` field.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("{0}")]
    ListingFailed(String),

    #[error("{0}")]
    NoTrackFound(String),

    #[error("{0}")]
    FetchFailed(String),

    #[error("{0}")]
    Unexpected(String),
}

impl TranscriptError {
    /// Short name of the failure kind, used for logging
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptError::ListingFailed(_) => "listing_failed",
            TranscriptError::NoTrackFound(_) => "no_track_found",
            TranscriptError::FetchFailed(_) => "fetch_failed",
            TranscriptError::Unexpected(_) => "unexpected",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            TranscriptError::ListingFailed(detail)
            | TranscriptError::NoTrackFound(detail)
            | TranscriptError::FetchFailed(detail)
            | TranscriptError::Unexpected(detail) => detail,
        }
    }
}
