/*!
 * # captrace
 *
 * A Rust library for acquiring YouTube caption data and reconciling it
 * into a single consistent cue timeline.
 *
 * ## Features
 *
 * - Scrape live rendered captions through a narrow DOM capability boundary
 * - Resolve structured caption tracks from host page state (three
 *   fallback strategies)
 * - Fetch and decode json3 caption payloads with retry/backoff
 * - Normalize raw caption events into sentence-level, non-overlapping cues
 * - Arbitrate live vs. structured sources behind one provider with a
 *   unified event stream
 * - Drive transcript views and sentence looping from the cue timeline
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `boundaries`: Capability traits for the host player, page, DOM, and network
 * - `cue`: Cue data model and time-indexed lookup
 * - `dedup`: Rolling-window duplicate suppression
 * - `scraper`: Live caption capture loop
 * - `track`: Structured track resolution and fetching:
 *   - `track::resolver`: Track discovery and weighted selection
 *   - `track::fetcher`: Payload retrieval with backoff and cancellation
 * - `normalizer`: Raw events to canonical cue lists
 * - `provider`: Source arbitration, session lifecycle, event fan-out
 * - `transcript`: Transcript accumulation and play-head tracking
 * - `sentence_loop`: Sentence looping over the cue timeline
 * - `events`: Typed event emitter with unsubscribe handles
 * - `errors`: Custom error types for the pipeline
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod boundaries;
pub mod cue;
pub mod dedup;
pub mod errors;
pub mod events;
pub mod language_utils;
pub mod normalizer;
pub mod provider;
pub mod scraper;
pub mod sentence_loop;
pub mod track;
pub mod transcript;

// Re-export main types for easier usage
pub use app_config::Config;
pub use cue::{Cue, CueSource, RawCueEvent};
pub use provider::{CaptionProvider, LiveCaption, SourceState};
