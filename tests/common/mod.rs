/*!
 * Common utilities and in-memory boundary mocks for the captrace test suite
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use captrace::boundaries::{CaptionDom, ContainerId, PageState, PlayerHandle, TrackPayloadSource};
use captrace::errors::FetchError;

/// Initialize logging for tests, ignoring repeat initialization
#[allow(dead_code)]
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Player mock: settable clock, recorded seeks and pause state
#[derive(Default)]
pub struct MockPlayer {
    now_ms: AtomicU64,
    paused: AtomicBool,
    pub seeks: Mutex<Vec<u64>>,
}

impl MockPlayer {
    pub fn set_time_ms(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl PlayerHandle for MockPlayer {
    fn current_time_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
    fn seek_to_ms(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
        self.seeks.lock().push(ms);
    }
    fn play(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }
    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Caption DOM mock: settable rendered text, detachable container, and an
/// explicit change channel standing in for mutation events
pub struct MemoryDom {
    text: Mutex<Option<String>>,
    attached: AtomicBool,
    changes: Mutex<Option<UnboundedSender<()>>>,
}

impl MemoryDom {
    pub fn new(initial_text: Option<&str>) -> Self {
        MemoryDom {
            text: Mutex::new(initial_text.map(|t| t.to_string())),
            attached: AtomicBool::new(true),
            changes: Mutex::new(None),
        }
    }

    /// Update the rendered caption and push a change notification
    pub fn render(&self, text: &str) {
        *self.text.lock() = Some(text.to_string());
        if let Some(tx) = self.changes.lock().as_ref() {
            let _ = tx.send(());
        }
    }

    #[allow(dead_code)]
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub fn reattach(&self) {
        self.attached.store(true, Ordering::SeqCst);
    }
}

impl CaptionDom for MemoryDom {
    fn find_caption_container(&self) -> Option<ContainerId> {
        if self.attached.load(Ordering::SeqCst) {
            Some(1)
        } else {
            None
        }
    }

    fn is_attached(&self, _container: ContainerId) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn read_text(&self, _container: ContainerId) -> Option<String> {
        if !self.attached.load(Ordering::SeqCst) {
            return None;
        }
        self.text.lock().clone()
    }

    fn observe(&self, _container: ContainerId) -> Option<UnboundedReceiver<()>> {
        let (tx, rx) = unbounded_channel();
        *self.changes.lock() = Some(tx);
        Some(rx)
    }
}

/// Page state mock with independently scriptable strategies
#[derive(Default)]
pub struct ScriptedPageState {
    pub api_tracks: Mutex<Option<serde_json::Value>>,
    pub response: Mutex<Option<serde_json::Value>>,
    pub scripts: Mutex<Vec<String>>,
}

impl ScriptedPageState {
    /// Page exposing one English track via the player response strategy
    pub fn with_english_track(base_url: &str) -> Self {
        let state = Self::default();
        *state.response.lock() = Some(serde_json::json!({
            "captions": {
                "playerCaptionsTracklistRenderer": {
                    "captionTracks": [{
                        "baseUrl": base_url,
                        "languageCode": "en",
                        "vssId": ".en",
                        "isTranslatable": true,
                        "name": {"simpleText": "English"}
                    }]
                }
            }
        }));
        state
    }
}

impl PageState for ScriptedPageState {
    fn player_api_tracks(&self) -> Option<serde_json::Value> {
        self.api_tracks.lock().clone()
    }
    fn player_response(&self) -> Option<serde_json::Value> {
        self.response.lock().clone()
    }
    fn inline_scripts(&self) -> Vec<String> {
        self.scripts.lock().clone()
    }
}

/// Payload source mock: queued responses, optional per-request latency,
/// and a record of requested URLs
#[derive(Default)]
pub struct MockPayloadSource {
    responses: Mutex<Vec<Result<String, FetchError>>>,
    pub delay_ms: AtomicU64,
    pub requests: Mutex<Vec<String>>,
}

impl MockPayloadSource {
    pub fn with_responses(responses: Vec<Result<String, FetchError>>) -> Self {
        MockPayloadSource {
            responses: Mutex::new(responses),
            delay_ms: AtomicU64::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_with(body: &str) -> Self {
        Self::with_responses(vec![Ok(body.to_string())])
    }
}

#[async_trait]
impl TrackPayloadSource for MockPayloadSource {
    async fn fetch_payload(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().push(url.to_string());

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let mut responses = self.responses.lock();
        if responses.is_empty() {
            // Once the queue runs dry, keep failing like a flaky endpoint
            return Err(FetchError::RequestFailed("no scripted response left".to_string()));
        }
        responses.remove(0)
    }
}

/// json3 payload with one event per `(text, start_ms, duration_ms)` triple
pub fn json3_body(events: &[(&str, u64, u64)]) -> String {
    let events: Vec<serde_json::Value> = events
        .iter()
        .map(|(text, start, dur)| {
            serde_json::json!({
                "tStartMs": start,
                "dDurationMs": dur,
                "segs": [{"utf8": text}]
            })
        })
        .collect();
    serde_json::json!({ "events": events }).to_string()
}

/// Shorthand for a provider wired entirely to in-memory mocks
pub struct MockStack {
    pub dom: Arc<MemoryDom>,
    pub player: Arc<MockPlayer>,
    pub page: Arc<ScriptedPageState>,
    pub source: Arc<MockPayloadSource>,
}

impl MockStack {
    pub fn new(initial_caption: Option<&str>, payload: Option<&str>) -> Self {
        let page = match payload {
            Some(_) => Arc::new(ScriptedPageState::with_english_track(
                "https://captions.test/api/timedtext?v=abc",
            )),
            None => Arc::new(ScriptedPageState::default()),
        };
        let source = match payload {
            Some(body) => Arc::new(MockPayloadSource::respond_with(body)),
            None => Arc::new(MockPayloadSource::default()),
        };

        MockStack {
            dom: Arc::new(MemoryDom::new(initial_caption)),
            player: Arc::new(MockPlayer::default()),
            page,
            source,
        }
    }
}
