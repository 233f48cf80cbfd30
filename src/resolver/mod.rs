use std::sync::Arc;

use crate::output::TranscriptResult;
use crate::provider::{Fragment, TrackList, TranscriptProvider, TranscriptTrack};
use crate::TranscriptError;

type SelectFn = for<'a> fn(&'a TrackList, &str) -> Option<&'a TranscriptTrack>;

/// One entry of the track preference order
struct SelectionStep {
    label: &'static str,
    select: SelectFn,
}

/// Track preference order, first match wins.
///
/// The last step ignores the language.
const SELECTION_ORDER: [SelectionStep; 3] = [
    SelectionStep {
        label: "manually created",
        select: manual_in_language,
    },
    SelectionStep {
        label: "auto-generated",
        select: generated_in_language,
    },
    SelectionStep {
        label: "first available",
        select: first_available,
    },
];

fn manual_in_language<'a>(tracks: &'a TrackList, language: &str) -> Option<&'a TranscriptTrack> {
    tracks.find_manual(language)
}

fn generated_in_language<'a>(
    tracks: &'a TrackList,
    language: &str,
) -> Option<&'a TranscriptTrack> {
    tracks.find_generated(language)
}

fn first_available<'a>(tracks: &'a TrackList, _language: &str) -> Option<&'a TranscriptTrack> {
    tracks.first()
}

/// Pick one track following the preference order
pub fn select_track<'a>(tracks: &'a TrackList, language: &str) -> Option<&'a TranscriptTrack> {
    SELECTION_ORDER.iter().find_map(|step| {
        let track = (step.select)(tracks, language);
        match track {
            Some(track) => tracing::debug!("Selected {} track {}", step.label, track),
            None => tracing::debug!("No {} track for language {:?}", step.label, language),
        }
        track
    })
}

/// Join fragment texts with a single space, as-is
pub fn flatten(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|fragment| fragment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a video id to the flattened text of one transcript track
pub struct TranscriptResolver<P> {
    provider: P,
    language: String,
}

impl<P: TranscriptProvider> TranscriptResolver<P> {
    /// Create a resolver preferring English tracks
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            language: "en".to_string(),
        }
    }

    /// Prefer tracks in `language` instead of English
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Resolve a video id, reporting every failure as data
    pub async fn resolve(&self, video_id: &str) -> TranscriptResult {
        self.try_resolve(video_id).await.into()
    }

    pub async fn try_resolve(&self, video_id: &str) -> Result<String, TranscriptError> {
        tracing::info!("Listing transcripts for video: {}", video_id);

        let tracks = self
            .provider
            .list_tracks(video_id)
            .await
            .map_err(|e| TranscriptError::ListingFailed(e.to_string()))?;

        let track = select_track(&tracks, &self.language).ok_or_else(|| {
            TranscriptError::NoTrackFound(format!(
                "No transcripts were found for the video {}",
                video_id
            ))
        })?;

        let fragments = self
            .provider
            .fetch_fragments(video_id, track)
            .await
            .map_err(|e| TranscriptError::FetchFailed(e.to_string()))?;

        tracing::info!(
            "Fetched {} fragment(s) from track {}",
            fragments.len(),
            track
        );

        Ok(flatten(&fragments))
    }
}

impl<P: TranscriptProvider + 'static> TranscriptResolver<P> {
    /// Resolve on a separate task so a panic inside the provider becomes a failure result
    pub async fn resolve_guarded(self: Arc<Self>, video_id: String) -> TranscriptResult {
        let task = tokio::spawn(async move { self.try_resolve(&video_id).await });

        match task.await {
            Ok(outcome) => outcome.into(),
            Err(join_error) => {
                tracing::error!("Transcript resolution aborted: {}", join_error);
                TranscriptError::Unexpected(join_error.to_string()).into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FailureCause, MockTranscriptProvider, ProviderError, TrackOrigin};

    fn track(code: &str, origin: TrackOrigin) -> TranscriptTrack {
        let kind = match origin {
            TrackOrigin::Manual => "manual",
            TrackOrigin::Generated => "asr",
        };
        TranscriptTrack {
            language_code: code.to_string(),
            language: code.to_string(),
            origin,
            base_url: format!("https://example.com/{code}/{kind}"),
        }
    }

    fn fragments(texts: &[&str]) -> Vec<Fragment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| Fragment {
                text: text.to_string(),
                start: i as f64,
                duration: 1.0,
            })
            .collect()
    }

    /// Provider whose tracks each return a transcript naming the track
    fn provider_with(tracks: Vec<TranscriptTrack>) -> MockTranscriptProvider {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_list_tracks()
            .times(1)
            .returning(move |id| Ok(TrackList::new(id, tracks.clone())));
        provider
            .expect_fetch_fragments()
            .times(1)
            .returning(|_, track| Ok(fragments(&[track.base_url.as_str()])));
        provider
    }

    fn resolve(provider: MockTranscriptProvider) -> TranscriptResult {
        tokio_test::block_on(TranscriptResolver::new(provider).resolve("abc"))
    }

    #[test]
    fn test_flatten_joins_with_single_space() {
        assert_eq!(flatten(&fragments(&["Hello", "world"])), "Hello world");
    }

    #[test]
    fn test_flatten_keeps_raw_text() {
        assert_eq!(
            flatten(&fragments(&[" padded ", "", "twice  spaced"])),
            " padded   twice  spaced"
        );
        assert_eq!(flatten(&[]), "");
    }

    #[test]
    fn test_manual_english_wins() {
        let provider = provider_with(vec![
            track("de", TrackOrigin::Manual),
            track("en", TrackOrigin::Generated),
            track("en", TrackOrigin::Manual),
        ]);

        assert_eq!(
            resolve(provider),
            TranscriptResult::success("https://example.com/en/manual")
        );
    }

    #[test]
    fn test_generated_english_when_no_manual_english() {
        let provider = provider_with(vec![
            track("fr", TrackOrigin::Manual),
            track("en", TrackOrigin::Generated),
        ]);

        assert_eq!(
            resolve(provider),
            TranscriptResult::success("https://example.com/en/asr")
        );
    }

    #[test]
    fn test_first_track_when_no_english() {
        let provider = provider_with(vec![
            track("ja", TrackOrigin::Generated),
            track("fr", TrackOrigin::Manual),
            track("de", TrackOrigin::Manual),
        ]);

        assert_eq!(
            resolve(provider),
            TranscriptResult::success("https://example.com/fr/manual")
        );
    }

    #[test]
    fn test_regional_english_is_not_english() {
        let provider = provider_with(vec![
            track("en-GB", TrackOrigin::Manual),
            track("en", TrackOrigin::Generated),
        ]);

        assert_eq!(
            resolve(provider),
            TranscriptResult::success("https://example.com/en/asr")
        );
    }

    #[test]
    fn test_preferred_language_override() {
        let provider = provider_with(vec![
            track("en", TrackOrigin::Manual),
            track("de", TrackOrigin::Generated),
        ]);
        let resolver = TranscriptResolver::new(provider).with_language("de");

        assert_eq!(resolver.language(), "de");
        assert_eq!(
            tokio_test::block_on(resolver.resolve("abc")),
            TranscriptResult::success("https://example.com/de/asr")
        );
    }

    #[test]
    fn test_no_tracks_is_a_failure() {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_list_tracks()
            .returning(|id| Ok(TrackList::new(id, Vec::new())));
        provider.expect_fetch_fragments().never();

        let outcome = tokio_test::block_on(TranscriptResolver::new(provider).try_resolve("abc"));
        let err = outcome.unwrap_err();
        assert_eq!(err.kind(), "no_track_found");
        assert!(!err.detail().is_empty());
    }

    #[test]
    fn test_listing_failure_carries_provider_message() {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_list_tracks()
            .returning(|id| Err(ProviderError::new(id, FailureCause::VideoUnavailable)));
        provider.expect_fetch_fragments().never();

        let expected = ProviderError::new("abc", FailureCause::VideoUnavailable).to_string();
        assert_eq!(resolve(provider), TranscriptResult::failure(expected));
    }

    #[test]
    fn test_fetch_failure() {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_list_tracks()
            .returning(|id| Ok(TrackList::new(id, vec![track("en", TrackOrigin::Manual)])));
        provider
            .expect_fetch_fragments()
            .returning(|id, _| Err(ProviderError::new(id, FailureCause::TooManyRequests)));

        let outcome = tokio_test::block_on(TranscriptResolver::new(provider).try_resolve("abc"));
        let err = outcome.unwrap_err();
        assert_eq!(err.kind(), "fetch_failed");
        assert!(err.detail().contains("too many requests"));
    }

    #[test]
    fn test_fetches_the_selected_track_only() {
        let mut provider = MockTranscriptProvider::new();
        provider.expect_list_tracks().returning(|id| {
            Ok(TrackList::new(
                id,
                vec![
                    track("en", TrackOrigin::Generated),
                    track("en", TrackOrigin::Manual),
                ],
            ))
        });
        provider
            .expect_fetch_fragments()
            .withf(|id, track| id == "abc" && track.origin == TrackOrigin::Manual)
            .times(1)
            .returning(|_, _| Ok(fragments(&["Hello", "world"])));

        assert_eq!(resolve(provider), TranscriptResult::success("Hello world"));
    }

    #[tokio::test]
    async fn test_guarded_resolution_turns_panics_into_failures() {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_list_tracks()
            .returning(|_| panic!("provider exploded"));

        let resolver = Arc::new(TranscriptResolver::new(provider));
        let result = resolver.resolve_guarded("abc".to_string()).await;

        match result {
            TranscriptResult::Failure { message } => assert!(message.contains("panicked")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_guarded_resolution_success() {
        let provider = provider_with(vec![track("en", TrackOrigin::Manual)]);

        let resolver = Arc::new(TranscriptResolver::new(provider));
        assert_eq!(
            resolver.resolve_guarded("abc".to_string()).await,
            TranscriptResult::success("https://example.com/en/manual")
        );
    }
}
