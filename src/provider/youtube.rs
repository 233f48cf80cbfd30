use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::LazyLock;

use super::captions::parse_timed_text;
use super::{
    FailureCause, Fragment, ProviderError, TrackList, TrackOrigin, TranscriptProvider,
    TranscriptTrack,
};
use crate::config::ProviderConfig;

const CONSENT_FORM_ACTION: &str = "action=\"https://consent.youtube.com/s\"";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const PO_TOKEN_MARKER: &str = "&exp=xpe";

const BOT_CHECK_REASON: &str = "Sign in to confirm you're not a bot";
const AGE_RESTRICTED_REASON: &str = "This video may be inappropriate for some users.";
const VIDEO_UNAVAILABLE_REASON: &str = "This video is unavailable";

static INNERTUBE_API_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid api key regex")
});

static CONSENT_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="v" value="(.*?)""#).expect("valid consent regex"));

/// Innertube player response, reduced to the parts needed for captions
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl CaptionTrack {
    fn into_track(self) -> TranscriptTrack {
        let language = self
            .name
            .and_then(|name| {
                name.simple_text
                    .or_else(|| name.runs.into_iter().next().map(|run| run.text))
            })
            .unwrap_or_else(|| self.language_code.clone());

        let origin = if self.kind.as_deref() == Some("asr") {
            TrackOrigin::Generated
        } else {
            TrackOrigin::Manual
        };

        TranscriptTrack {
            language_code: self.language_code,
            language,
            origin,
            base_url: self.base_url.replace("&fmt=srv3", ""),
        }
    }
}

/// YouTube transcript provider talking to the watch page and the Innertube API
pub struct YoutubeProvider {
    client: Client,
    base_url: String,
    client_name: String,
    client_version: String,
}

impl YoutubeProvider {
    pub fn new(config: &ProviderConfig) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)?,
        );

        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers);

        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        if !config.system_proxy {
            builder = builder.no_proxy();
        }

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_name: config.client_name.clone(),
            client_version: config.client_version.clone(),
        })
    }

    /// Fetch the watch page, accepting the cookie consent interstitial once if shown
    async fn fetch_video_html(&self, video_id: &str) -> Result<String, ProviderError> {
        let html = self.fetch_watch_page(video_id, None).await?;
        if !html.contains(CONSENT_FORM_ACTION) {
            return Ok(html);
        }

        tracing::debug!("Consent page shown for {}, retrying with consent cookie", video_id);
        let consent = extract_consent_value(&html).ok_or_else(|| {
            ProviderError::new(video_id, FailureCause::FailedToCreateConsentCookie)
        })?;

        let html = self.fetch_watch_page(video_id, Some(&consent)).await?;
        if html.contains(CONSENT_FORM_ACTION) {
            return Err(ProviderError::new(
                video_id,
                FailureCause::FailedToCreateConsentCookie,
            ));
        }

        Ok(html)
    }

    async fn fetch_watch_page(
        &self,
        video_id: &str,
        consent: Option<&str>,
    ) -> Result<String, ProviderError> {
        tracing::debug!("Fetching watch page for: {}", video_id);

        let mut request = self
            .client
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", video_id)]);

        if let Some(value) = consent {
            request = request.header(COOKIE, format!("CONSENT=YES+{}", value));
        }

        let response = request.send().await.map_err(|e| transport_error(video_id, e))?;
        let response = check_status(video_id, response)?;

        response.text().await.map_err(|e| transport_error(video_id, e))
    }

    async fn fetch_player_response(
        &self,
        video_id: &str,
        api_key: &str,
    ) -> Result<PlayerResponse, ProviderError> {
        tracing::debug!("Requesting Innertube player data for: {}", video_id);

        let body = json!({
            "context": {
                "client": {
                    "clientName": self.client_name,
                    "clientVersion": self.client_version,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .client
            .post(format!("{}/youtubei/v1/player", self.base_url))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(video_id, e))?;
        let response = check_status(video_id, response)?;

        let text = response.text().await.map_err(|e| transport_error(video_id, e))?;
        serde_json::from_str(&text).map_err(|e| {
            ProviderError::new(video_id, FailureCause::YouTubeDataUnparsable(e.to_string()))
        })
    }
}

#[async_trait]
impl TranscriptProvider for YoutubeProvider {
    async fn list_tracks(&self, video_id: &str) -> Result<TrackList, ProviderError> {
        let html = self.fetch_video_html(video_id).await?;
        let api_key = extract_innertube_api_key(video_id, &html)?;
        let player = self.fetch_player_response(video_id, &api_key).await?;

        let tracks = tracks_from_player_response(video_id, player)?;
        tracing::debug!("Found {} transcript track(s) for {}", tracks.len(), video_id);

        Ok(tracks)
    }

    async fn fetch_fragments(
        &self,
        video_id: &str,
        track: &TranscriptTrack,
    ) -> Result<Vec<Fragment>, ProviderError> {
        if track.base_url.contains(PO_TOKEN_MARKER) {
            return Err(ProviderError::new(video_id, FailureCause::PoTokenRequired));
        }

        tracing::debug!("Fetching fragments for track {}", track);

        let response = self
            .client
            .get(&track.base_url)
            .send()
            .await
            .map_err(|e| transport_error(video_id, e))?;
        let xml = check_status(video_id, response)?
            .text()
            .await
            .map_err(|e| transport_error(video_id, e))?;

        parse_timed_text(&xml).map_err(|e| {
            ProviderError::new(video_id, FailureCause::YouTubeDataUnparsable(e.to_string()))
        })
    }
}

fn transport_error(video_id: &str, error: reqwest::Error) -> ProviderError {
    ProviderError::new(video_id, FailureCause::Http(error.to_string()))
}

fn check_status(video_id: &str, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let cause = if status == StatusCode::TOO_MANY_REQUESTS {
        FailureCause::TooManyRequests
    } else {
        FailureCause::HttpStatus(status.as_u16())
    };
    Err(ProviderError::new(video_id, cause))
}

fn extract_consent_value(html: &str) -> Option<String> {
    CONSENT_VALUE
        .captures(html)
        .map(|caps| caps[1].to_string())
}

fn extract_innertube_api_key(video_id: &str, html: &str) -> Result<String, ProviderError> {
    if let Some(caps) = INNERTUBE_API_KEY.captures(html) {
        return Ok(caps[1].to_string());
    }

    let cause = if html.contains(RECAPTCHA_MARKER) {
        FailureCause::IpBlocked
    } else {
        FailureCause::YouTubeDataUnparsable("INNERTUBE_API_KEY not found on watch page".to_string())
    };
    Err(ProviderError::new(video_id, cause))
}

fn assert_playability(
    video_id: &str,
    status: Option<&PlayabilityStatus>,
) -> Result<(), ProviderError> {
    let code = status.and_then(|s| s.status.as_deref());
    if code == Some("OK") {
        return Ok(());
    }

    let reason = status.and_then(|s| s.reason.as_deref()).unwrap_or_default();
    let cause = match code {
        Some("LOGIN_REQUIRED") if reason == BOT_CHECK_REASON => FailureCause::RequestBlocked,
        Some("LOGIN_REQUIRED") if reason == AGE_RESTRICTED_REASON => FailureCause::AgeRestricted,
        Some("ERROR") if reason == VIDEO_UNAVAILABLE_REASON => {
            if video_id.starts_with("http://") || video_id.starts_with("https://") {
                FailureCause::InvalidVideoId
            } else {
                FailureCause::VideoUnavailable
            }
        }
        _ => FailureCause::VideoUnplayable(if reason.is_empty() {
            "No reason specified".to_string()
        } else {
            reason.to_string()
        }),
    };

    Err(ProviderError::new(video_id, cause))
}

fn tracks_from_player_response(
    video_id: &str,
    player: PlayerResponse,
) -> Result<TrackList, ProviderError> {
    assert_playability(video_id, player.playability_status.as_ref())?;

    let caption_tracks = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .and_then(|r| r.caption_tracks)
        .ok_or_else(|| ProviderError::new(video_id, FailureCause::TranscriptsDisabled))?;

    let tracks = caption_tracks
        .into_iter()
        .map(CaptionTrack::into_track)
        .collect();

    Ok(TrackList::new(video_id, tracks))
}
