/*!
 * Structured caption track acquisition.
 *
 * - `resolver`: locates caption track descriptors in host page state and
 *   picks the best candidate for the session
 * - `fetcher`: retrieves and decodes the structured payload for a resolved
 *   track, with a fixed backoff schedule and cooperative cancellation
 */

pub mod fetcher;
pub mod resolver;

pub use fetcher::{FetchOutcome, TrackFetcher};
pub use resolver::{TrackDescriptor, get_caption_tracks, pick_best_track};
