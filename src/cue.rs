use std::fmt;
use serde::{Deserialize, Serialize};

// @module: Cue data model and time-indexed lookup

/// Which pipeline produced a cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueSource {
    /// Scraped from the rendered caption overlay (approximate timing)
    Live,
    /// Decoded from a fetched structured caption track (authoritative timing)
    Full,
}

/// Single timed caption unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    // @field: Caption text, whitespace-collapsed and newline-free
    pub text: String,

    // @field: Start time in ms
    pub start_ms: u64,

    // @field: End time in ms, strictly greater than start_ms
    pub end_ms: u64,

    // @field: Originating pipeline
    pub source: CueSource,
}

/// Raw caption event before normalization: pre-joined text plus a start
/// offset and an optional duration, exactly as the structured payload or
/// the scraper hands it over.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCueEvent {
    pub text: String,
    pub start_ms: u64,
    pub duration_ms: Option<u64>,
}

impl Cue {
    /// Creates a new cue - used by tests and external consumers
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64, source: CueSource) -> Self {
        Cue {
            text: text.into(),
            start_ms,
            end_ms,
            source,
        }
    }

    /// Cue duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Whether the play-head position falls inside this cue
    pub fn contains(&self, at_ms: u64) -> bool {
        at_ms >= self.start_ms && at_ms < self.end_ms
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} --> {} {}",
            Cue::format_timestamp(self.start_ms),
            Cue::format_timestamp(self.end_ms),
            self.text
        )
    }
}

/// Index of the latest cue whose `start_ms <= at_ms`, or -1 when no cue
/// has started yet (including the empty list). Binary search over the
/// `start_ms`-sorted list; O(log n).
///
/// A time before the first cue deliberately returns -1 rather than
/// clamping to 0, so callers can distinguish "no active cue yet" from
/// "first cue active". Behaves identically over live and full lists.
pub fn cue_index_at(cues: &[Cue], at_ms: u64) -> isize {
    if cues.is_empty() {
        return -1;
    }

    let mut lo: usize = 0;
    let mut hi: usize = cues.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if cues[mid].start_ms <= at_ms {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    lo as isize - 1
}

/// Cue active at (or most recently started before) the given time
pub fn find_cue_at(cues: &[Cue], at_ms: u64) -> Option<&Cue> {
    let idx = cue_index_at(cues, at_ms);
    if idx < 0 {
        None
    } else {
        cues.get(idx as usize)
    }
}
