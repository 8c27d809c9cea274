use crate::cue::{Cue, cue_index_at};

// @module: Transcript accumulation and play-head tracking

/// One row of the transcript: a cue or an accumulated live caption
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptItem {
    pub text: String,
    pub start_ms: u64,
}

/// Scrollable transcript model.
///
/// Uses full cues when available; otherwise accumulates live captions as
/// they arrive. The host UI renders `items()` and re-highlights whenever
/// `update_highlight` reports a change.
#[derive(Debug, Default)]
pub struct TranscriptView {
    items: Vec<TranscriptItem>,
    /// Authoritative cue list, when acquired; drives index lookups
    cues: Option<Vec<Cue>>,
    current_highlight: isize,
}

impl TranscriptView {
    pub fn new() -> Self {
        TranscriptView {
            items: Vec::new(),
            cues: None,
            current_highlight: -1,
        }
    }

    pub fn items(&self) -> &[TranscriptItem] {
        &self.items
    }

    pub fn has_full_cues(&self) -> bool {
        self.cues.is_some()
    }

    /// Replace the transcript wholesale with the authoritative cue list
    pub fn set_full_cues(&mut self, cues: &[Cue]) {
        self.items = cues
            .iter()
            .map(|c| TranscriptItem {
                text: c.text.clone(),
                start_ms: c.start_ms,
            })
            .collect();
        self.cues = Some(cues.to_vec());
        self.current_highlight = -1;
    }

    /// Accumulate a live caption. Ignored once full cues exist, and when
    /// the same text was already appended (the provider dedups a rolling
    /// window, but loops and scrubbing can resurface older captions).
    /// Returns true when a new row was appended.
    pub fn on_caption(&mut self, text: &str, t_ms: u64) -> bool {
        if self.cues.is_some() {
            return false;
        }
        if self.items.iter().any(|item| item.text == text) {
            return false;
        }
        self.items.push(TranscriptItem {
            text: text.to_string(),
            start_ms: t_ms,
        });
        true
    }

    /// Recompute the highlighted row for the play-head position. Returns
    /// the new index when it changed, `None` when the highlight is stable.
    pub fn update_highlight(&mut self, now_ms: u64) -> Option<isize> {
        let new_idx = match &self.cues {
            Some(cues) => cue_index_at(cues, now_ms),
            None => {
                // Live mode: latest accumulated item at or before now
                let mut idx: isize = -1;
                for (i, item) in self.items.iter().enumerate().rev() {
                    if item.start_ms <= now_ms {
                        idx = i as isize;
                        break;
                    }
                }
                idx
            }
        };

        if new_idx == self.current_highlight {
            return None;
        }
        self.current_highlight = new_idx;
        Some(new_idx)
    }

    pub fn highlighted(&self) -> isize {
        self.current_highlight
    }

    /// Start a fresh transcript (new video, mode re-entry)
    pub fn reset(&mut self) {
        self.items.clear();
        self.cues = None;
        self.current_highlight = -1;
    }
}

/// Compact clock format for transcript rows: `m:ss`, or `h:mm:ss` past an
/// hour
pub fn format_time(ms: u64) -> String {
    let total_sec = ms / 1000;
    let h = total_sec / 3600;
    let m = (total_sec % 3600) / 60;
    let s = total_sec % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
