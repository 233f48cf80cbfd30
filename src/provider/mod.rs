use async_trait::async_trait;
use std::fmt;

pub mod captions;
pub mod youtube;

pub use youtube::YoutubeProvider;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Whether a track was authored by a person or generated by speech recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOrigin {
    Manual,
    Generated,
}

/// One caption stream of a video
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptTrack {
    /// Language code as reported by the provider (`en`, `en-GB`, `de`, ...)
    pub language_code: String,

    /// Display name of the language
    pub language: String,

    pub origin: TrackOrigin,

    /// Provider URL the fragments are fetched from
    pub base_url: String,
}

impl TranscriptTrack {
    pub fn is_generated(&self) -> bool {
        self.origin == TrackOrigin::Generated
    }
}

impl fmt::Display for TranscriptTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (\"{}\")", self.language_code, self.language)?;
        if self.is_generated() {
            write!(f, " [auto-generated]")?;
        }
        Ok(())
    }
}

/// One timed caption entry
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// Tracks available for a single video.
///
/// Iterates manually created tracks first, then generated ones, each group in provider order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackList {
    video_id: String,
    manual: Vec<TranscriptTrack>,
    generated: Vec<TranscriptTrack>,
}

impl TrackList {
    pub fn new(video_id: impl Into<String>, tracks: Vec<TranscriptTrack>) -> Self {
        let (generated, manual): (Vec<_>, Vec<_>) =
            tracks.into_iter().partition(TranscriptTrack::is_generated);

        Self {
            video_id: video_id.into(),
            manual,
            generated,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Manually created track with exactly this language code
    pub fn find_manual(&self, language_code: &str) -> Option<&TranscriptTrack> {
        self.manual.iter().find(|track| track.language_code == language_code)
    }

    /// Auto-generated track with exactly this language code
    pub fn find_generated(&self, language_code: &str) -> Option<&TranscriptTrack> {
        self.generated.iter().find(|track| track.language_code == language_code)
    }

    /// First track in iteration order, any language
    pub fn first(&self) -> Option<&TranscriptTrack> {
        self.iter().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranscriptTrack> {
        self.manual.iter().chain(self.generated.iter())
    }

    pub fn len(&self) -> usize {
        self.manual.len() + self.generated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Why the provider could not deliver a transcript
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    #[error("The video is no longer available")]
    VideoUnavailable,

    #[error("You provided an invalid video id. Make sure you are using the video id and NOT the url!")]
    InvalidVideoId,

    #[error("The video is unplayable for the following reason: {0}")]
    VideoUnplayable(String),

    #[error("This video is age-restricted and requires authentication")]
    AgeRestricted,

    #[error("YouTube is blocking requests from your IP (bot check)")]
    RequestBlocked,

    #[error("YouTube is blocking requests from your IP (captcha)")]
    IpBlocked,

    #[error("YouTube is receiving too many requests from this IP")]
    TooManyRequests,

    #[error("Subtitles are disabled for this video")]
    TranscriptsDisabled,

    #[error("Failed to automatically give consent to saving cookies")]
    FailedToCreateConsentCookie,

    #[error("The requested video cannot be retrieved without a PO Token")]
    PoTokenRequired,

    #[error("The data required to fetch the transcript is not parsable: {0}")]
    YouTubeDataUnparsable(String),

    #[error("Request to YouTube failed with HTTP status {0}")]
    HttpStatus(u16),

    #[error("Request to YouTube failed: {0}")]
    Http(String),
}

/// A failed provider call for one video
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Could not retrieve a transcript for the video {}{}! This is most likely caused by: {}",
    WATCH_URL,
    .video_id,
    .cause
)]
pub struct ProviderError {
    pub video_id: String,
    #[source]
    pub cause: FailureCause,
}

impl ProviderError {
    pub fn new(video_id: impl Into<String>, cause: FailureCause) -> Self {
        Self {
            video_id: video_id.into(),
            cause,
        }
    }
}

/// Capability to list and fetch the caption tracks of a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// List the tracks available for a video
    async fn list_tracks(&self, video_id: &str) -> Result<TrackList, ProviderError>;

    /// Fetch the ordered caption fragments of a track
    async fn fetch_fragments(
        &self,
        video_id: &str,
        track: &TranscriptTrack,
    ) -> Result<Vec<Fragment>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(code: &str, origin: TrackOrigin) -> TranscriptTrack {
        TranscriptTrack {
            language_code: code.to_string(),
            language: code.to_uppercase(),
            origin,
            base_url: format!("https://example.com/{code}"),
        }
    }

    #[test]
    fn test_iteration_puts_manual_tracks_first() {
        let list = TrackList::new(
            "abc",
            vec![
                track("de", TrackOrigin::Generated),
                track("fr", TrackOrigin::Manual),
                track("en", TrackOrigin::Generated),
                track("es", TrackOrigin::Manual),
            ],
        );

        let codes: Vec<_> = list.iter().map(|t| t.language_code.as_str()).collect();
        assert_eq!(codes, ["fr", "es", "de", "en"]);
        assert_eq!(list.first().unwrap().language_code, "fr");
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_find_by_origin_and_exact_code() {
        let list = TrackList::new(
            "abc",
            vec![
                track("en-GB", TrackOrigin::Manual),
                track("en", TrackOrigin::Generated),
            ],
        );

        assert!(list.find_manual("en").is_none());
        assert_eq!(list.find_manual("en-GB").unwrap().language_code, "en-GB");
        assert!(list.find_generated("en").unwrap().is_generated());
    }

    #[test]
    fn test_empty_list() {
        let list = TrackList::new("abc", Vec::new());
        assert!(list.is_empty());
        assert!(list.first().is_none());
        assert_eq!(list.video_id(), "abc");
    }

    #[test]
    fn test_track_display() {
        assert_eq!(track("en", TrackOrigin::Manual).to_string(), "en (\"EN\")");
        assert_eq!(
            track("en", TrackOrigin::Generated).to_string(),
            "en (\"EN\") [auto-generated]"
        );
    }

    #[test]
    fn test_provider_error_message() {
        let err = ProviderError::new("abc123", FailureCause::TranscriptsDisabled);
        assert_eq!(
            err.to_string(),
            "Could not retrieve a transcript for the video https://www.youtube.com/watch?v=abc123! \
             This is most likely caused by: Subtitles are disabled for this video"
        );
    }
}
