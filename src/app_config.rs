use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::language_utils;
use crate::normalizer::NormalizerOptions;
use crate::track::fetcher::DEFAULT_BACKOFF_SCHEDULE_MS;

/// Application configuration module
/// This module handles the caption pipeline configuration including
/// loading, validating and saving configuration settings.
/// Represents the pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Preferred caption language code (ISO)
    pub preferred_language: String,

    /// Log level
    pub log_level: LogLevel,

    /// Live scraper settings
    pub scraper: ScraperSection,

    /// Cue normalization thresholds
    pub normalizer: NormalizerOptions,

    /// Structured track fetch settings
    pub fetch: FetchSection,

    /// Timeline emitter settings
    pub timeline: TimelineSection,
}

/// Log level for the pipeline
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Equivalent log crate filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Live scraper section
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ScraperSection {
    // @field: Poll interval while the caption container is undiscovered, ms
    pub discovery_poll_ms: u64,

    // @field: Re-read interval once attached, ms
    pub read_poll_ms: u64,

    // @field: Rolling dedup window size
    pub dedup_window: usize,

    // @field: Bound on the approximate live cue list
    pub max_live_cues: usize,
}

impl Default for ScraperSection {
    fn default() -> Self {
        ScraperSection {
            discovery_poll_ms: 120,
            read_poll_ms: 250,
            dedup_window: 12,
            max_live_cues: 500,
        }
    }
}

/// Track fetch section
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FetchSection {
    // @field: Wait before each attempt, ms; length is the attempt count
    pub backoff_schedule_ms: Vec<u64>,

    // @field: Per-request timeout, seconds
    pub request_timeout_secs: u64,

    // @field: Cookie header forwarded with track requests
    pub cookie_header: Option<String>,
}

impl Default for FetchSection {
    fn default() -> Self {
        FetchSection {
            backoff_schedule_ms: DEFAULT_BACKOFF_SCHEDULE_MS.to_vec(),
            request_timeout_secs: 20,
            cookie_header: None,
        }
    }
}

/// Timeline emitter section
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TimelineSection {
    // @field: Whether to republish precisely-timed live-caption events once
    // the full cue list is acquired
    pub enabled: bool,

    // @field: Recompute interval, ms
    pub interval_ms: u64,
}

impl Default for TimelineSection {
    fn default() -> Self {
        TimelineSection {
            enabled: true,
            interval_ms: 300,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            preferred_language: "en".to_string(),
            log_level: LogLevel::default(),
            scraper: ScraperSection::default(),
            normalizer: NormalizerOptions::default(),
            fetch: FetchSection::default(),
            timeline: TimelineSection::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate all settings
    pub fn validate(&self) -> Result<()> {
        language_utils::normalize_code(&self.preferred_language)
            .map_err(|_| anyhow!("Invalid preferred language: {}", self.preferred_language))?;

        if self.fetch.backoff_schedule_ms.is_empty() {
            return Err(anyhow!("Fetch backoff schedule must contain at least one attempt"));
        }
        if self.timeline.interval_ms == 0 {
            return Err(anyhow!("Timeline emitter interval must be positive"));
        }
        if self.scraper.discovery_poll_ms == 0 || self.scraper.read_poll_ms == 0 {
            return Err(anyhow!("Scraper poll intervals must be positive"));
        }
        if self.scraper.max_live_cues == 0 {
            return Err(anyhow!("Live cue list bound must be positive"));
        }
        if self.normalizer.min_cue_duration_ms == 0 {
            return Err(anyhow!("Minimum cue duration must be positive"));
        }

        Ok(())
    }
}
