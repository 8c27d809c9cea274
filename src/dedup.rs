use std::collections::VecDeque;

// @module: Rolling-window duplicate suppression for scraped captions

/// Default number of recent captions remembered by the filter
pub const DEFAULT_DEDUP_WINDOW: usize = 12;

/// Suppresses repeated caption text within a short rolling window.
///
/// The caption overlay re-renders many times per actual caption (incremental
/// character painting), so the scraper would otherwise re-emit an unchanged
/// caption as a new event on every mutation. The filter keeps a fixed-size
/// FIFO of 32-bit hashes of recently seen text; anything already in the
/// window is reported as a duplicate.
///
/// The hash is the order-sensitive polynomial `h = 31*h + code` over UTF-16
/// code units, wrapping at 32 bits. Not cryptographic: a collision only
/// delays one emission cycle, which is acceptable here.
#[derive(Debug)]
pub struct DedupFilter {
    window: VecDeque<i32>,
    capacity: usize,
}

impl DedupFilter {
    /// Create a filter with the default window size
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DEDUP_WINDOW)
    }

    /// Create a filter remembering the last `capacity` distinct captions
    pub fn with_capacity(capacity: usize) -> Self {
        DedupFilter {
            window: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Returns true when the text was seen within the window. A hit leaves
    /// the window untouched; a miss records the text, evicting the oldest
    /// entry when over capacity.
    pub fn is_duplicate(&mut self, text: &str) -> bool {
        let h = simple_hash(text);
        if self.window.contains(&h) {
            return true;
        }

        self.window.push_back(h);
        if self.window.len() > self.capacity {
            self.window.pop_front();
        }
        false
    }

    /// Forget everything seen so far
    pub fn reset(&mut self) {
        self.window.clear();
    }
}

impl Default for DedupFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// 32-bit polynomial text hash, matching the overlay renderer's cadence of
/// near-identical strings (order-sensitive so "a b" and "b a" differ)
fn simple_hash(text: &str) -> i32 {
    let mut h: i32 = 0;
    for code in text.encode_utf16() {
        h = h.wrapping_mul(31).wrapping_add(code as i32);
    }
    h
}
