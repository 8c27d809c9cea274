use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::boundaries::{PageState, TrackPayloadSource};
use crate::cue::RawCueEvent;
use crate::errors::FetchError;
use crate::track::resolver::{self, TrackDescriptor};

// @module: Structured track payload retrieval with backoff and cancellation

/// Default backoff schedule: immediate, then increasing waits. The page
/// often has not exposed its track metadata yet when a session starts, so
/// each attempt re-resolves from scratch.
pub const DEFAULT_BACKOFF_SCHEDULE_MS: [u64; 4] = [0, 250, 700, 1400];

/// Machine-parseable variant forced onto the track URL
const PAYLOAD_FORMAT: &str = "json3";

/// Successful acquisition: the track that won plus its decoded events
#[derive(Debug)]
pub struct FetchOutcome {
    pub track: TrackDescriptor,
    pub events: Vec<RawCueEvent>,
}

/// Retrieves the structured caption payload for the best resolvable track.
///
/// Cancellation is cooperative: the caller captures a generation token when
/// the session starts, and the fetcher compares it against the live counter
/// before every attempt and before committing a result. A stale token means
/// the session restarted mid-flight (fast navigation between videos); the
/// result is silently abandoned so it cannot clobber the newer session.
pub struct TrackFetcher {
    page: Arc<dyn PageState>,
    source: Arc<dyn TrackPayloadSource>,
    preferred_language: String,
    backoff_schedule_ms: Vec<u64>,
}

impl TrackFetcher {
    pub fn new(
        page: Arc<dyn PageState>,
        source: Arc<dyn TrackPayloadSource>,
        preferred_language: impl Into<String>,
        backoff_schedule_ms: Vec<u64>,
    ) -> Self {
        let backoff_schedule_ms = if backoff_schedule_ms.is_empty() {
            DEFAULT_BACKOFF_SCHEDULE_MS.to_vec()
        } else {
            backoff_schedule_ms
        };

        TrackFetcher {
            page,
            source,
            preferred_language: preferred_language.into(),
            backoff_schedule_ms,
        }
    }

    /// Run the retry schedule until a non-empty payload parses or the
    /// schedule is exhausted. First success wins and stops retrying.
    pub async fn load_full_track_cues(
        &self,
        token: u64,
        generation: &AtomicU64,
    ) -> Result<FetchOutcome, FetchError> {
        let attempts = self.backoff_schedule_ms.len();

        for (attempt, delay_ms) in self.backoff_schedule_ms.iter().enumerate() {
            if *delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
            }
            if generation.load(Ordering::SeqCst) != token {
                return Err(FetchError::StaleGeneration);
            }

            match self.attempt_fetch().await {
                Ok(outcome) => {
                    // Re-check after the await: the session may have been
                    // torn down while the request was in flight
                    if generation.load(Ordering::SeqCst) != token {
                        return Err(FetchError::StaleGeneration);
                    }
                    debug!(
                        "track fetch succeeded on attempt {}/{} ({} events)",
                        attempt + 1,
                        attempts,
                        outcome.events.len()
                    );
                    return Ok(outcome);
                }
                Err(e) if e.is_retryable() => {
                    debug!("track fetch attempt {}/{} failed: {}", attempt + 1, attempts, e);
                }
                Err(e) => return Err(e),
            }
        }

        warn!("track fetch exhausted {} attempts, staying on live captions", attempts);
        Err(FetchError::Exhausted { attempts })
    }

    async fn attempt_fetch(&self) -> Result<FetchOutcome, FetchError> {
        let tracks = resolver::get_caption_tracks(self.page.as_ref());
        let Some(track) = resolver::pick_best_track(&tracks, &self.preferred_language) else {
            return Err(FetchError::RequestFailed("no resolvable caption track".to_string()));
        };
        let Some(base_url) = track.base_url.as_deref() else {
            return Err(FetchError::RequestFailed("best track has no base URL".to_string()));
        };

        let url = payload_url(base_url)?;
        let body = self.source.fetch_payload(&url).await?;
        let events = parse_json3_payload(&body)?;

        Ok(FetchOutcome {
            track: track.clone(),
            events,
        })
    }
}

/// Force the machine-parseable payload format onto a track base URL
pub fn payload_url(base_url: &str) -> Result<String, FetchError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| FetchError::RequestFailed(format!("bad track URL: {}", e)))?;
    // Replace any existing fmt rather than appending a duplicate
    let others: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(others)
        .append_pair("fmt", PAYLOAD_FORMAT);
    Ok(url.into())
}

// json3 wire shapes; segment-less events are timing markers and are dropped

#[derive(Debug, Deserialize)]
struct Json3Payload {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    d_duration_ms: Option<u64>,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    utf8: Option<String>,
}

/// Decode a json3 payload into raw cue events
pub fn parse_json3_payload(body: &str) -> Result<Vec<RawCueEvent>, FetchError> {
    let payload: Json3Payload =
        serde_json::from_str(body).map_err(|e| FetchError::ParseError(e.to_string()))?;

    let events: Vec<RawCueEvent> = payload
        .events
        .into_iter()
        .filter_map(|ev| {
            let text: String = ev
                .segs?
                .into_iter()
                .filter_map(|seg| seg.utf8)
                .collect::<Vec<_>>()
                .join("");
            if text.trim().is_empty() {
                return None;
            }
            Some(RawCueEvent {
                text,
                start_ms: ev.t_start_ms,
                duration_ms: ev.d_duration_ms,
            })
        })
        .collect();

    if events.is_empty() {
        return Err(FetchError::EmptyPayload);
    }
    Ok(events)
}

/// HTTP transport for track payloads, forwarding cookies when provided.
///
/// Connection pooling mirrors the rest of the stack: one client per source,
/// keep-alive enabled, short timeout since payloads are small.
#[derive(Debug)]
pub struct HttpTrackSource {
    client: Client,
    cookie_header: Option<String>,
}

impl HttpTrackSource {
    pub fn new(timeout_secs: u64, cookie_header: Option<String>) -> Self {
        HttpTrackSource {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            cookie_header,
        }
    }
}

impl Default for HttpTrackSource {
    fn default() -> Self {
        Self::new(20, None)
    }
}

#[async_trait]
impl TrackPayloadSource for HttpTrackSource {
    async fn fetch_payload(&self, url: &str) -> Result<String, FetchError> {
        let mut request = self.client.get(url);
        if let Some(cookie) = &self.cookie_header {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::RequestFailed(e.to_string()))
    }
}
