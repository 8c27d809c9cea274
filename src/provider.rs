use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::app_config::Config;
use crate::boundaries::{CaptionDom, PageState, PlayerHandle, TrackPayloadSource};
use crate::cue::{Cue, CueSource, cue_index_at, find_cue_at};
use crate::errors::FetchError;
use crate::events::{EventEmitter, Subscription};
use crate::normalizer;
use crate::scraper::{CaptionSink, LiveScraper, ScraperConfig};
use crate::track::TrackFetcher;

// @module: Caption source orchestration and unified event stream

/// Best-effort near-real-time caption event
#[derive(Debug, Clone, PartialEq)]
pub struct LiveCaption {
    pub text: String,
    pub time_ms: u64,
}

/// Which source currently backs the session's timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// No caption has been seen and no track acquired
    NoSource,
    /// Scraped captions only; approximate timing. Also the permanent
    /// fallback when no structured track can be extracted.
    LiveOnly,
    /// Structured track decoded; authoritative timing. One-way per session.
    FullAcquired,
}

/// Per-session mutable state, constructed on `start()` and discarded on
/// `stop()` so nothing leaks across navigations
struct Session {
    state: SourceState,
    live_cues: Vec<Cue>,
    full_cues: Option<Vec<Cue>>,
}

impl Session {
    fn fresh() -> Self {
        Session {
            state: SourceState::NoSource,
            live_cues: Vec::new(),
            full_cues: None,
        }
    }
}

struct ProviderInner {
    config: Config,
    dom: Arc<dyn CaptionDom>,
    player: Arc<dyn PlayerHandle>,
    page: Arc<dyn PageState>,
    payload_source: Arc<dyn TrackPayloadSource>,

    /// Monotonic counter bumped on every start/stop; async work captures the
    /// value at spawn time and abandons results on mismatch
    generation: AtomicU64,
    session: Mutex<Session>,
    tasks: Mutex<Vec<JoinHandle<()>>>,

    live_events: EventEmitter<LiveCaption>,
    cues_events: EventEmitter<Vec<Cue>>,
}

/// Arbitrates between the live scraper and the structured track, owning the
/// session lifecycle and republishing a unified event stream.
///
/// State machine: `NoSource → LiveOnly → FullAcquired`, with `stop()`
/// returning to `NoSource` from anywhere. The `LiveOnly → FullAcquired`
/// transition is one-way per session: once a full list exists, scraped
/// output is never merged back in, avoiding a timeline that mixes
/// authoritative and approximate timings.
///
/// No method on this type panics or surfaces an internal error; failure
/// degrades to the weaker source.
pub struct CaptionProvider {
    inner: Arc<ProviderInner>,
}

impl CaptionProvider {
    pub fn new(
        config: Config,
        dom: Arc<dyn CaptionDom>,
        player: Arc<dyn PlayerHandle>,
        page: Arc<dyn PageState>,
        payload_source: Arc<dyn TrackPayloadSource>,
    ) -> Self {
        CaptionProvider {
            inner: Arc::new(ProviderInner {
                config,
                dom,
                player,
                page,
                payload_source,
                generation: AtomicU64::new(0),
                session: Mutex::new(Session::fresh()),
                tasks: Mutex::new(Vec::new()),
                live_events: EventEmitter::new(),
                cues_events: EventEmitter::new(),
            }),
        }
    }

    /// Begin a caption session: start the live scraper and kick off the
    /// structured track acquisition. A session already in progress is torn
    /// down first.
    pub fn start(&self) {
        let inner = &self.inner;
        inner.abort_tasks();
        let token = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *inner.session.lock() = Session::fresh();
        debug!("caption session {} starting", token);

        // Live scraper pipeline (interim timeline)
        let sink_inner = Arc::clone(inner);
        let sink: CaptionSink = Arc::new(move |text, t_ms| {
            sink_inner.ingest_live(token, text, t_ms);
        });
        let scraper = LiveScraper::new(
            Arc::clone(&inner.dom),
            Arc::clone(&inner.player),
            sink,
            ScraperConfig {
                discovery_poll_ms: inner.config.scraper.discovery_poll_ms,
                read_poll_ms: inner.config.scraper.read_poll_ms,
                dedup_window: inner.config.scraper.dedup_window,
            },
        );
        let scrape_task = tokio::spawn(scraper.run());

        // Structured track pipeline (authoritative once it lands)
        let fetch_inner = Arc::clone(inner);
        let fetch_task = tokio::spawn(async move {
            let fetcher = TrackFetcher::new(
                Arc::clone(&fetch_inner.page),
                Arc::clone(&fetch_inner.payload_source),
                fetch_inner.config.preferred_language.clone(),
                fetch_inner.config.fetch.backoff_schedule_ms.clone(),
            );
            match fetcher.load_full_track_cues(token, &fetch_inner.generation).await {
                Ok(outcome) => fetch_inner.commit_full(token, outcome.events),
                Err(FetchError::StaleGeneration) => {
                    debug!("discarding stale track fetch for session {}", token);
                }
                Err(FetchError::Exhausted { attempts }) => {
                    // Permanent fallback mode, not an error: videos without
                    // an extractable track stay on scraped captions
                    info!(
                        "no structured track after {} attempts, session {} stays live-only",
                        attempts, token
                    );
                }
                Err(e) => warn!("track acquisition failed: {}", e),
            }
        });

        inner.tasks.lock().extend([scrape_task, fetch_task]);
    }

    /// Tear down the session: cancel in-flight fetches via the generation
    /// token, stop all timers and tasks, drop listener registrations, and
    /// return to `NoSource`.
    pub fn stop(&self) {
        let inner = &self.inner;
        let token = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        inner.abort_tasks();
        *inner.session.lock() = Session::fresh();
        inner.live_events.clear();
        inner.cues_events.clear();
        debug!("caption session stopped (generation {})", token);
    }

    /// Subscribe to the best-effort live caption stream
    pub fn on_live_caption<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LiveCaption) + Send + Sync + 'static,
    {
        self.inner.live_events.subscribe(listener)
    }

    /// Subscribe to full cue list availability. A late subscriber is
    /// immediately invoked with the current list; this replay is part of
    /// the contract, so consumers attaching after acquisition still
    /// receive the data. Only the new listener sees the replay; earlier
    /// subscribers already got the list when it was committed.
    pub fn on_full_cues<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Vec<Cue>) + Send + Sync + 'static,
    {
        let replay = self.inner.session.lock().full_cues.clone();
        if let Some(cues) = &replay {
            listener(cues);
        }
        self.inner.cues_events.subscribe(listener)
    }

    /// Snapshot of the full cue list, if acquired
    pub fn get_full_cues(&self) -> Option<Vec<Cue>> {
        self.inner.session.lock().full_cues.clone()
    }

    /// Index of the active cue at the given time (or the play head when
    /// `None`) over whichever list currently backs the session; −1 when no
    /// cue has started
    pub fn get_cue_index(&self, at_ms: Option<u64>) -> isize {
        let at = at_ms.unwrap_or_else(|| self.inner.player.current_time_ms());
        let session = self.inner.session.lock();
        match &session.full_cues {
            Some(full) => cue_index_at(full, at),
            None => cue_index_at(&session.live_cues, at),
        }
    }

    /// The active cue at the given time (or the play head when `None`)
    pub fn find_cue_at(&self, at_ms: Option<u64>) -> Option<Cue> {
        let at = at_ms.unwrap_or_else(|| self.inner.player.current_time_ms());
        let session = self.inner.session.lock();
        match &session.full_cues {
            Some(full) => find_cue_at(full, at).cloned(),
            None => find_cue_at(&session.live_cues, at).cloned(),
        }
    }

    /// Current source state
    pub fn state(&self) -> SourceState {
        self.inner.session.lock().state
    }
}

impl Drop for CaptionProvider {
    fn drop(&mut self) {
        // Spawned tasks hold the inner Arc; abort them so the session does
        // not outlive its provider
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.abort_tasks();
    }
}

impl ProviderInner {
    fn abort_tasks(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }

    /// A scraped caption arrived. Appends to the bounded live list, drives
    /// the `NoSource → LiveOnly` transition, and fans the caption out.
    fn ingest_live(self: &Arc<Self>, token: u64, text: String, t_ms: u64) {
        if self.generation.load(Ordering::SeqCst) != token {
            return;
        }

        let emit = {
            let mut session = self.session.lock();
            match session.state {
                SourceState::FullAcquired => {
                    // The scraper keeps running but its output is never
                    // merged into the authoritative timeline. With the
                    // timeline emitter active its events would duplicate
                    // the precisely-timed stream, so they are dropped too.
                    !self.config.timeline.enabled
                }
                _ => {
                    if session.state == SourceState::NoSource {
                        session.state = SourceState::LiveOnly;
                        info!("first live caption received, entering live-only mode");
                    }
                    self.append_live_cue(&mut session, &text, t_ms);
                    true
                }
            }
        };

        if emit {
            self.live_events.emit(&LiveCaption { text, time_ms: t_ms });
        }
    }

    /// Append a scraped caption to the approximate timeline, preserving
    /// start-order and non-overlap. Scrub-backward emissions (start before
    /// the list tail) are not appended; the event still reaches listeners.
    fn append_live_cue(&self, session: &mut Session, text: &str, t_ms: u64) {
        let opts = &self.config.normalizer;

        if let Some(last) = session.live_cues.last_mut() {
            if t_ms <= last.start_ms {
                return;
            }
            // Close the previous approximate cue where the new one begins
            let cap = t_ms.saturating_sub(opts.boundary_margin_ms).max(last.start_ms + 1);
            last.end_ms = last.end_ms.min(cap);
        }

        session.live_cues.push(Cue::new(
            text,
            t_ms,
            t_ms + opts.default_duration_ms,
            CueSource::Live,
        ));

        let bound = self.config.scraper.max_live_cues;
        if session.live_cues.len() > bound {
            let excess = session.live_cues.len() - bound;
            session.live_cues.drain(..excess);
        }
    }

    /// The track fetcher produced raw events for this session. Normalizes
    /// them, installs the authoritative list, fires the full-cues event,
    /// and starts the timeline emitter when configured.
    fn commit_full(self: &Arc<Self>, token: u64, events: Vec<crate::cue::RawCueEvent>) {
        let cues = normalizer::normalize(&events, CueSource::Full, &self.config.normalizer);
        if cues.is_empty() {
            debug!("normalized track was empty, ignoring");
            return;
        }

        let snapshot = {
            let mut session = self.session.lock();
            if self.generation.load(Ordering::SeqCst) != token {
                return;
            }
            session.full_cues = Some(cues.clone());
            session.state = SourceState::FullAcquired;
            cues
        };

        info!("full cue list acquired ({} cues)", snapshot.len());
        self.cues_events.emit(&snapshot);

        if self.config.timeline.enabled {
            let timeline_inner = Arc::clone(self);
            let task = tokio::spawn(timeline_inner.run_timeline_emitter(token));
            self.tasks.lock().push(task);
        }
    }

    /// Fixed-interval emitter active in `FullAcquired`: recomputes the
    /// active cue index against the play head and republishes it on the
    /// live-caption stream, so consumers of that stream see precisely-timed
    /// updates instead of DOM-scrape-timed ones.
    async fn run_timeline_emitter(self: Arc<Self>, token: u64) {
        let interval = Duration::from_millis(self.config.timeline.interval_ms);
        let mut last_index: isize = -1;

        loop {
            tokio::time::sleep(interval).await;
            if self.generation.load(Ordering::SeqCst) != token {
                return;
            }

            let now_ms = self.player.current_time_ms();
            let current = {
                let session = self.session.lock();
                let Some(full) = &session.full_cues else { return };
                let idx = cue_index_at(full, now_ms);
                if idx < 0 || idx == last_index {
                    None
                } else {
                    Some((idx, full[idx as usize].text.clone()))
                }
            };

            if let Some((idx, text)) = current {
                last_index = idx;
                self.live_events.emit(&LiveCaption { text, time_ms: now_ms });
            }
        }
    }
}
