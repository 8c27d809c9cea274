use std::sync::Arc;

use log::debug;

use crate::boundaries::PlayerHandle;
use crate::cue::{Cue, cue_index_at};

// @module: Sentence looping over the cue timeline

/// Play-head margin before a cue's end at which the loop reacts; absorbs
/// the polling granularity of the host's tick timer
const END_MARGIN_MS: u64 = 50;

/// User-facing loop settings
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// How many times each sentence plays before pausing or advancing
    pub loop_count: u32,

    /// Pause and wait for the user after a sentence finishes its loops;
    /// otherwise auto-advance to the next cue
    pub pause_after_sentence: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        LoopSettings {
            loop_count: 2,
            pause_after_sentence: true,
        }
    }
}

/// What the loop did on a tick, for the host UI's counter display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopTick {
    /// Nothing to do yet
    Idle,
    /// Seeked back to the cue start for another repetition
    Looped,
    /// Finished the repetitions and paused for the user
    Paused,
    /// Finished the repetitions and moved to the next cue
    Advanced,
}

/// Loops over sentence cues for listening practice.
///
/// Works with full cues (precise, seek-driven) or falls back to live
/// captions, where each new distinct caption marks a sentence boundary.
/// The host drives `tick()` on a short interval while the mode is active.
pub struct SentenceLoop {
    player: Arc<dyn PlayerHandle>,
    settings: LoopSettings,
    active: bool,

    cues: Option<Vec<Cue>>,
    current_idx: usize,
    loop_remaining: u32,

    live_sentences: Vec<(String, u64)>,
    live_current: isize,
}

impl SentenceLoop {
    pub fn new(player: Arc<dyn PlayerHandle>, settings: LoopSettings) -> Self {
        SentenceLoop {
            player,
            settings,
            active: false,
            cues: None,
            current_idx: 0,
            loop_remaining: 0,
            live_sentences: Vec::new(),
            live_current: -1,
        }
    }

    /// Enter loop mode. With full cues the loop starts from the cue under
    /// the play head; without them it waits for live captions.
    pub fn activate(&mut self, full_cues: Option<Vec<Cue>>) {
        self.active = true;
        self.live_sentences.clear();
        self.live_current = -1;
        self.cues = full_cues.filter(|c| !c.is_empty());

        if let Some(cues) = &self.cues {
            let idx = cue_index_at(cues, self.player.current_time_ms());
            self.current_idx = if idx >= 0 { idx as usize } else { 0 };
            self.loop_remaining = self.settings.loop_count;
            self.play_current();
        }
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.cues = None;
        self.live_sentences.clear();
        self.live_current = -1;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn settings_mut(&mut self) -> &mut LoopSettings {
        &mut self.settings
    }

    /// Text of the sentence currently being looped
    pub fn current_text(&self) -> Option<&str> {
        match &self.cues {
            Some(cues) => cues.get(self.current_idx).map(|c| c.text.as_str()),
            None => {
                if self.live_current >= 0 {
                    self.live_sentences
                        .get(self.live_current as usize)
                        .map(|(t, _)| t.as_str())
                } else {
                    None
                }
            }
        }
    }

    /// Repetitions left for the current sentence
    pub fn loop_remaining(&self) -> u32 {
        self.loop_remaining
    }

    /// Periodic check in full-cue mode: loop, pause, or advance when the
    /// play head crosses the cue's end margin.
    pub fn tick(&mut self) -> LoopTick {
        if !self.active {
            return LoopTick::Idle;
        }
        let Some(cue) = self.cues.as_ref().and_then(|c| c.get(self.current_idx)).cloned() else {
            return LoopTick::Idle;
        };

        let now_ms = self.player.current_time_ms();
        if now_ms + END_MARGIN_MS < cue.end_ms {
            return LoopTick::Idle;
        }

        self.loop_remaining = self.loop_remaining.saturating_sub(1);
        if self.loop_remaining > 0 {
            self.player.seek_to_ms(cue.start_ms);
            self.player.play();
            LoopTick::Looped
        } else if self.settings.pause_after_sentence {
            self.player.pause();
            LoopTick::Paused
        } else {
            let len = self.cues.as_ref().map(|c| c.len()).unwrap_or(0);
            if self.current_idx + 1 < len {
                self.current_idx += 1;
                self.loop_remaining = self.settings.loop_count;
                self.play_current();
            }
            LoopTick::Advanced
        }
    }

    /// Jump to the previous sentence
    pub fn prev_sentence(&mut self) {
        if self.cues.is_some() {
            self.current_idx = self.current_idx.saturating_sub(1);
            self.loop_remaining = self.settings.loop_count;
            self.play_current();
        } else if self.live_current > 0 {
            self.live_current -= 1;
            self.loop_remaining = self.settings.loop_count;
            self.replay_live();
        }
    }

    /// Jump to the next sentence
    pub fn next_sentence(&mut self) {
        if let Some(cues) = &self.cues {
            self.current_idx = (self.current_idx + 1).min(cues.len().saturating_sub(1));
            self.loop_remaining = self.settings.loop_count;
            self.play_current();
        } else if self.live_current + 1 < self.live_sentences.len() as isize {
            self.live_current += 1;
            self.loop_remaining = self.settings.loop_count;
            self.replay_live();
        }
    }

    /// Restart the current sentence from its beginning
    pub fn replay_current(&mut self) {
        self.loop_remaining = self.settings.loop_count;
        if self.cues.is_some() {
            self.play_current();
        } else {
            self.replay_live();
        }
    }

    /// Live-caption fallback: each new distinct caption is treated as the
    /// next sentence boundary.
    pub fn on_caption(&mut self, text: &str, t_ms: u64) {
        if !self.active || self.cues.is_some() {
            return;
        }
        if self.live_sentences.iter().any(|(t, _)| t == text) {
            return;
        }

        self.live_sentences.push((text.to_string(), t_ms));
        let new_idx = self.live_sentences.len() as isize - 1;

        if self.live_current < 0 {
            self.live_current = new_idx;
            self.loop_remaining = self.settings.loop_count;
            return;
        }

        // A new caption means the previous sentence just ended
        self.loop_remaining = self.loop_remaining.saturating_sub(1);
        if self.loop_remaining > 0 {
            debug!("looping live sentence {}", self.live_current);
            self.replay_live();
        } else if self.settings.pause_after_sentence {
            self.player.pause();
        } else {
            self.live_current = new_idx;
            self.loop_remaining = self.settings.loop_count;
        }
    }

    fn play_current(&mut self) {
        if let Some(cue) = self.cues.as_ref().and_then(|c| c.get(self.current_idx)) {
            self.player.seek_to_ms(cue.start_ms);
            self.player.play();
        }
    }

    fn replay_live(&self) {
        if self.live_current >= 0 {
            if let Some((_, start_ms)) = self.live_sentences.get(self.live_current as usize) {
                self.player.seek_to_ms(*start_ms);
                self.player.play();
            }
        }
    }
}
