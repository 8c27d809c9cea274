use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};

use crate::boundaries::{CaptionDom, ContainerId, PlayerHandle};
use crate::dedup::DedupFilter;
use crate::normalizer::collapse_whitespace;

// @module: Live caption capture from the rendered overlay

/// Sink receiving `(text, timestamp_ms)` for each newly rendered caption
pub type CaptionSink = Arc<dyn Fn(String, u64) + Send + Sync>;

/// Timing knobs for the capture loop
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Poll interval while the caption container has not been located yet.
    /// Kept short so the first caption lands quickly after mode entry.
    pub discovery_poll_ms: u64,

    /// Re-read interval once attached, used between change notifications
    /// and as the only driver when the host cannot push changes
    pub read_poll_ms: u64,

    /// Rolling dedup window size
    pub dedup_window: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            discovery_poll_ms: 120,
            read_poll_ms: 250,
            dedup_window: crate::dedup::DEFAULT_DEDUP_WINDOW,
        }
    }
}

/// Dumb capture device over the `CaptionDom` boundary.
///
/// Locates the caption container (polling until it appears), re-reads its
/// flattened text on every change notification or poll tick, collapses
/// whitespace, drops duplicates within the rolling window, and emits
/// surviving captions with the externally-owned play-head timestamp.
///
/// Deliberately does NOT merge progressive re-emissions of a growing
/// utterance; that is the normalizer's job, which keeps this component
/// testable without any DOM.
pub struct LiveScraper {
    dom: Arc<dyn CaptionDom>,
    player: Arc<dyn PlayerHandle>,
    sink: CaptionSink,
    dedup: DedupFilter,
    config: ScraperConfig,
}

impl LiveScraper {
    pub fn new(
        dom: Arc<dyn CaptionDom>,
        player: Arc<dyn PlayerHandle>,
        sink: CaptionSink,
        config: ScraperConfig,
    ) -> Self {
        let dedup = DedupFilter::with_capacity(config.dedup_window);
        LiveScraper {
            dom,
            player,
            sink,
            dedup,
            config,
        }
    }

    /// Capture loop. Runs until the owning task is aborted; a detached
    /// container transparently restarts discovery.
    pub async fn run(mut self) {
        loop {
            let container = self.discover_container().await;
            debug!("caption container located ({})", container);

            // Emit immediately instead of waiting for the first change tick
            self.emit_current(container);
            self.watch_container(container).await;

            debug!("caption container detached, restarting discovery");
        }
    }

    async fn discover_container(&self) -> ContainerId {
        loop {
            if let Some(container) = self.dom.find_caption_container() {
                return container;
            }
            tokio::time::sleep(Duration::from_millis(self.config.discovery_poll_ms)).await;
        }
    }

    /// Follow one located container until it detaches
    async fn watch_container(&mut self, container: ContainerId) {
        let poll = Duration::from_millis(self.config.read_poll_ms);

        match self.dom.observe(container) {
            Some(mut changes) => loop {
                tokio::select! {
                    changed = changes.recv() => {
                        if changed.is_none() {
                            // Host dropped the change stream with the page
                            // re-render; rediscover
                            return;
                        }
                    }
                    _ = tokio::time::sleep(poll) => {}
                }

                if !self.dom.is_attached(container) {
                    return;
                }
                self.emit_current(container);
            },
            None => loop {
                tokio::time::sleep(poll).await;
                if !self.dom.is_attached(container) {
                    return;
                }
                self.emit_current(container);
            },
        }
    }

    fn emit_current(&mut self, container: ContainerId) {
        let Some(raw) = self.dom.read_text(container) else {
            return;
        };
        let text = collapse_whitespace(&raw);
        if text.is_empty() {
            return;
        }
        if self.dedup.is_duplicate(&text) {
            trace!("dropping duplicate caption: {}", text);
            return;
        }

        (self.sink)(text, self.player.current_time_ms());
    }
}
