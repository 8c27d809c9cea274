use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cue::{Cue, CueSource, RawCueEvent};

// @module: Raw caption events -> canonical sentence-level cue list

// @const: Whitespace run matcher for caption text cleanup
static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Tuning knobs for the normalization pipeline.
///
/// The defaults were tuned empirically against real caption tracks; none of
/// them has a derivation beyond "works on the corpus", which is why they are
/// options rather than constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerOptions {
    /// End time assigned when an event carries no usable duration
    pub default_duration_ms: u64,

    /// A growing re-emission starting within this window of the previous
    /// cue's start is treated as the same utterance
    pub squash_window_ms: u64,

    /// How many leading cues to sample for granularity detection
    pub granularity_sample: usize,

    /// Word count at or below which a cue counts as "word-like"
    pub short_word_max: usize,

    /// Fraction of word-like cues that classifies the source as fragment-granular
    pub short_word_ratio: f64,

    /// Duration at or below which a cue counts as "short"
    pub short_duration_ms: u64,

    /// Fraction of short cues that classifies the source as fragment-granular
    pub short_duration_ratio: f64,

    /// Gap to the next fragment that forces a sentence flush
    pub coalesce_gap_ms: u64,

    /// Accumulated word count that forces a sentence flush
    pub coalesce_max_words: usize,

    /// Accumulated duration that forces a sentence flush
    pub coalesce_max_duration_ms: u64,

    /// Minimum visible duration enforced on every cue
    pub min_cue_duration_ms: u64,

    /// Margin kept between a cue's end and the next cue's start
    pub boundary_margin_ms: u64,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        NormalizerOptions {
            default_duration_ms: 1800,
            squash_window_ms: 350,
            granularity_sample: 140,
            short_word_max: 2,
            short_word_ratio: 0.58,
            short_duration_ms: 900,
            short_duration_ratio: 0.62,
            coalesce_gap_ms: 620,
            coalesce_max_words: 14,
            coalesce_max_duration_ms: 3600,
            min_cue_duration_ms: 120,
            boundary_margin_ms: 10,
        }
    }
}

/// Collapse whitespace runs (including newlines) to single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text.trim(), " ").into_owned()
}

/// Convert raw caption events into the canonical cue list.
///
/// Structured tracks are optimized for rendering, not for "what sentence is
/// this and when does it end". The consuming features (sentence looping,
/// transcript highlighting, navigation) need sentence-like units with clean
/// non-overlapping time ranges, reconstructed here from whatever granularity
/// the source actually provides:
///
/// 1. assemble events into cues, defaulting missing durations
/// 2. squash progressive re-emissions of the same utterance
/// 3. detect word/fragment-granular sources by sampling
/// 4. coalesce fragments into sentence-level cues when needed
/// 5. tighten boundaries into sorted, non-overlapping ranges
pub fn normalize(events: &[RawCueEvent], source: CueSource, opts: &NormalizerOptions) -> Vec<Cue> {
    let assembled = assemble_events(events, source, opts);
    let squashed = squash_progressive(assembled, opts);

    let cues = if should_coalesce_word_like_cues(&squashed, opts) {
        debug!(
            "fragment-granular source detected, coalescing {} cues",
            squashed.len()
        );
        coalesce_short_cues(squashed, opts)
    } else {
        squashed
    };

    tighten_boundaries(cues, opts)
}

/// Step 1: fragment assembly. Events with empty text are dropped; a missing
/// or zero duration gets the default floor.
fn assemble_events(events: &[RawCueEvent], source: CueSource, opts: &NormalizerOptions) -> Vec<Cue> {
    let mut cues: Vec<Cue> = events
        .iter()
        .filter_map(|ev| {
            let text = collapse_whitespace(&ev.text);
            if text.is_empty() {
                return None;
            }
            let end_ms = match ev.duration_ms {
                Some(d) if d > 0 => ev.start_ms + d,
                _ => ev.start_ms + opts.default_duration_ms,
            };
            Some(Cue::new(text, ev.start_ms, end_ms, source))
        })
        .collect();

    // Raw payloads are nominally ordered, but scrape timing can wobble
    cues.sort_by_key(|c| c.start_ms);
    cues
}

/// Step 2: progressive-cue squashing.
///
/// Many caption formats re-send an utterance with text growing by suffix
/// across consecutive events ("he", "he said", "he said hello"), simulating
/// live typing. An exact repeat extends the previous cue; a prefix-extension
/// starting within the squash window replaces its text and extends its end.
fn squash_progressive(cues: Vec<Cue>, opts: &NormalizerOptions) -> Vec<Cue> {
    let mut out: Vec<Cue> = Vec::with_capacity(cues.len());

    for cue in cues {
        if let Some(prev) = out.last_mut() {
            if cue.text == prev.text {
                prev.end_ms = prev.end_ms.max(cue.end_ms);
                continue;
            }

            let near_start = cue.start_ms.abs_diff(prev.start_ms) <= opts.squash_window_ms;
            if near_start && cue.text.starts_with(prev.text.as_str()) {
                prev.text = cue.text;
                prev.end_ms = prev.end_ms.max(cue.end_ms);
                continue;
            }

            // Distinct texts at the same start are simultaneously rendered
            // lines of one caption; keeping both would make a zero-width
            // slot that no end time can legally fill
            if cue.start_ms == prev.start_ms {
                prev.text.push(' ');
                prev.text.push_str(&cue.text);
                prev.end_ms = prev.end_ms.max(cue.end_ms);
                continue;
            }
        }
        out.push(cue);
    }

    out
}

/// Step 3: granularity detection. Samples the leading cues and classifies
/// the source as fragment-granular when most are word-like or very short.
pub fn should_coalesce_word_like_cues(cues: &[Cue], opts: &NormalizerOptions) -> bool {
    if cues.is_empty() {
        return false;
    }

    let sample = &cues[..cues.len().min(opts.granularity_sample)];
    let n = sample.len() as f64;

    let word_like = sample
        .iter()
        .filter(|c| c.text.split_whitespace().count() <= opts.short_word_max)
        .count() as f64;
    let short = sample
        .iter()
        .filter(|c| c.duration_ms() <= opts.short_duration_ms)
        .count() as f64;

    word_like / n >= opts.short_word_ratio || short / n >= opts.short_duration_ratio
}

/// Step 4: fragment coalescing. Greedily accumulates consecutive fragments
/// into one sentence-level cue, flushing the buffer when the text reaches
/// terminal punctuation, the gap to the next fragment is too wide, or the
/// accumulated size crosses the word/duration caps.
pub fn coalesce_short_cues(cues: Vec<Cue>, opts: &NormalizerOptions) -> Vec<Cue> {
    let mut out: Vec<Cue> = Vec::new();
    let mut buffer: Option<Cue> = None;

    for i in 0..cues.len() {
        let cue = &cues[i];

        match buffer.as_mut() {
            None => buffer = Some(cue.clone()),
            Some(acc) => {
                join_fragment(&mut acc.text, &cue.text);
                acc.end_ms = acc.end_ms.max(cue.end_ms);
            }
        }

        let acc = buffer.as_ref().unwrap();
        let next_start = cues.get(i + 1).map(|n| n.start_ms);

        let flush = match next_start {
            None => true,
            Some(start) => {
                ends_sentence(&acc.text)
                    || start.saturating_sub(cue.end_ms) > opts.coalesce_gap_ms
                    || acc.text.split_whitespace().count() >= opts.coalesce_max_words
                    || acc.duration_ms() >= opts.coalesce_max_duration_ms
            }
        };

        if flush {
            out.push(buffer.take().unwrap());
        }
    }

    out
}

/// Punctuation-aware fragment join: no space before closing punctuation, no
/// space after an opening bracket/quote already at the buffer's tail.
fn join_fragment(buffer: &mut String, next: &str) {
    if buffer.is_empty() {
        buffer.push_str(next);
        return;
    }

    let closes = next
        .chars()
        .next()
        .is_some_and(|c| matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | ')' | ']' | '}' | '…' | '”' | '’' | '»'));
    let opens = buffer
        .chars()
        .last()
        .is_some_and(|c| matches!(c, '(' | '[' | '{' | '“' | '‘' | '«'));

    if !closes && !opens {
        buffer.push(' ');
    }
    buffer.push_str(next);
}

/// Whether accumulated text ends a sentence (terminal punctuation, possibly
/// followed by a closing quote or bracket)
fn ends_sentence(text: &str) -> bool {
    for c in text.chars().rev() {
        match c {
            '"' | '\'' | ')' | ']' | '”' | '’' | '»' => continue,
            '.' | '!' | '?' | '…' => return true,
            _ => return false,
        }
    }
    false
}

/// Step 5: boundary tightening. Clamps every cue's end into
/// `[start + min_duration, next.start - margin]`, guaranteeing non-overlap
/// with a minimum visible duration. When two cues start closer together than
/// the minimum duration allows, non-overlap wins.
fn tighten_boundaries(mut cues: Vec<Cue>, opts: &NormalizerOptions) -> Vec<Cue> {
    let len = cues.len();
    for i in 0..len {
        let floor = cues[i].start_ms + opts.min_cue_duration_ms;
        let ceil = if i + 1 < len {
            Some(cues[i + 1].start_ms.saturating_sub(opts.boundary_margin_ms))
        } else {
            None
        };

        let mut end = cues[i].end_ms.max(floor);
        if let Some(ceil) = ceil {
            if end > ceil {
                end = ceil.max(cues[i].start_ms + 1);
            }
        }
        cues[i].end_ms = end;
    }
    cues
}
