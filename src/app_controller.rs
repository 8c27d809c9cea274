use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::{debug, info};

use crate::app_config::Config;
use crate::boundaries::{PageState, TrackPayloadSource};
use crate::errors::TrackError;
use crate::cue::{Cue, CueSource};
use crate::normalizer;
use crate::track::fetcher::{HttpTrackSource, parse_json3_payload, payload_url};
use crate::track::resolver::{TrackDescriptor, get_caption_tracks, pick_best_track};
use crate::transcript;

// @module: CLI workflows over the caption pipeline

/// Output rendering for the transcript command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `[m:ss] text` rows
    Text,
    /// Numbered SRT blocks
    Srt,
    /// JSON cue array
    Json,
}

/// Page state backed by a fetched (or locally saved) watch page.
///
/// The CLI has no live player object, so strategies (a) and (b) find
/// nothing and resolution always lands on the inline-script scan, the
/// same last-resort path the in-page pipeline uses.
pub struct HtmlPageState {
    scripts: Vec<String>,
}

impl HtmlPageState {
    /// Collect inline script bodies from a watch page document
    pub fn from_html(html: &str) -> Self {
        let mut scripts = Vec::new();
        let mut rest = html;

        while let Some(open) = rest.find("<script") {
            let after_tag = &rest[open..];
            let Some(body_start) = after_tag.find('>') else { break };
            let body = &after_tag[body_start + 1..];
            let Some(close) = body.find("</script>") else { break };
            if !body[..close].trim().is_empty() {
                scripts.push(body[..close].to_string());
            }
            rest = &body[close..];
        }

        // Degenerate documents (saved fragments, test fixtures) may carry
        // the payload outside any script tag
        if scripts.is_empty() {
            scripts.push(html.to_string());
        }

        HtmlPageState { scripts }
    }
}

impl PageState for HtmlPageState {
    fn player_api_tracks(&self) -> Option<serde_json::Value> {
        None
    }

    fn player_response(&self) -> Option<serde_json::Value> {
        None
    }

    fn inline_scripts(&self) -> Vec<String> {
        self.scripts.clone()
    }
}

/// Main controller for the caption CLI
pub struct Controller {
    config: Config,
}

impl Controller {
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Controller { config })
    }

    /// Resolve and list the caption tracks a watch page exposes
    pub async fn list_tracks(&self, input: &str) -> Result<Vec<TrackDescriptor>> {
        let page = self.load_page(input).await?;
        Ok(get_caption_tracks(&page))
    }

    /// Fetch the best track for the input, normalize it, and render it in
    /// the requested format
    pub async fn fetch_transcript(&self, input: &str, format: OutputFormat) -> Result<String> {
        let page = self.load_page(input).await?;

        let tracks = get_caption_tracks(&page);
        let track = pick_best_track(&tracks, &self.config.preferred_language)
            .ok_or(TrackError::NoTracks)?;
        let base_url = track.base_url.as_deref().ok_or(TrackError::NoBaseUrl)?;

        info!(
            "fetching caption track {} ({})",
            track.vss_id.as_deref().unwrap_or("?"),
            track.language_code.as_deref().unwrap_or("?")
        );

        let source = HttpTrackSource::new(
            self.config.fetch.request_timeout_secs,
            self.config.fetch.cookie_header.clone(),
        );
        let url = payload_url(base_url)?;
        let body = source.fetch_payload(&url).await?;
        let events = parse_json3_payload(&body)?;

        let cues = normalizer::normalize(&events, CueSource::Full, &self.config.normalizer);
        info!("normalized {} events into {} cues", events.len(), cues.len());

        render_cues(&cues, format)
    }

    /// Load page state from a watch URL or a saved HTML file
    async fn load_page(&self, input: &str) -> Result<HtmlPageState> {
        let html = if input.starts_with("http://") || input.starts_with("https://") {
            self.fetch_watch_page(input).await?
        } else {
            let path = Path::new(input);
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read page file: {}", path.display()))?
        };

        debug!("loaded watch page ({} bytes)", html.len());
        Ok(HtmlPageState::from_html(&html))
    }

    async fn fetch_watch_page(&self, url: &str) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.fetch.request_timeout_secs))
            .build()
            .unwrap_or_default();

        let mut request = client.get(url).header(
            reqwest::header::ACCEPT_LANGUAGE,
            format!("{};q=0.9", self.config.preferred_language),
        );
        if let Some(cookie) = &self.config.fetch.cookie_header {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to fetch watch page: {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("watch page request returned status {}", status));
        }

        response.text().await.context("Failed to read watch page body")
    }
}

/// Render a normalized cue list in the requested output format
pub fn render_cues(cues: &[Cue], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for cue in cues {
                out.push_str(&format!(
                    "[{}] {}\n",
                    transcript::format_time(cue.start_ms),
                    cue.text
                ));
            }
            Ok(out)
        }
        OutputFormat::Srt => {
            let mut out = String::new();
            for (i, cue) in cues.iter().enumerate() {
                out.push_str(&format!(
                    "{}\n{} --> {}\n{}\n\n",
                    i + 1,
                    Cue::format_timestamp(cue.start_ms),
                    Cue::format_timestamp(cue.end_ms),
                    cue.text
                ));
            }
            Ok(out)
        }
        OutputFormat::Json => serde_json::to_string_pretty(cues).context("Failed to encode cues"),
    }
}
