/*!
 * Capability traits at the seams between the caption core and its host.
 *
 * The core never touches the page, the player, or the network directly; it
 * talks to these narrow interfaces. A browser host implements them over the
 * real DOM and player object, the CLI implements them over a fetched watch
 * page, and the test suite implements them in memory.
 */

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::errors::FetchError;

/// Opaque identifier for a located caption container. The host assigns
/// identifiers; the core only compares and passes them back.
pub type ContainerId = u64;

/// Clock and transport controls of the host video player.
///
/// The core treats the player as an opaque clock/controller; the play-head
/// position is externally owned and only ever queried, never extrapolated.
pub trait PlayerHandle: Send + Sync {
    /// Current play-head position in milliseconds
    fn current_time_ms(&self) -> u64;

    /// Seek to an absolute position
    fn seek_to_ms(&self, ms: u64);

    fn play(&self);

    fn pause(&self);

    fn is_paused(&self) -> bool;
}

/// Read-only access to caption-track metadata embedded in the host page.
/// Each method corresponds to one discovery strategy; returning `None` (or
/// an empty list) means "this strategy found nothing" and the resolver
/// falls through to the next.
pub trait PageState: Send + Sync {
    /// Strategy (a): caption track list exposed by the host player API,
    /// already in JSON form
    fn player_api_tracks(&self) -> Option<serde_json::Value>;

    /// Strategy (b): page-global preloaded player-response state
    fn player_response(&self) -> Option<serde_json::Value>;

    /// Strategy (c): raw inline script payloads for the last-resort scan
    fn inline_scripts(&self) -> Vec<String>;
}

/// Rendered-caption access for the live scraper.
pub trait CaptionDom: Send + Sync {
    /// Locate the caption container, if currently present
    fn find_caption_container(&self) -> Option<ContainerId>;

    /// Whether a previously located container is still attached
    fn is_attached(&self, container: ContainerId) -> bool;

    /// Flattened text currently rendered in the container. `None` when the
    /// container is gone; an empty string when it is present but blank.
    fn read_text(&self, container: ContainerId) -> Option<String>;

    /// Change notifications for the container (a DOM host forwards mutation
    /// events here). `None` means the host cannot push changes and the
    /// scraper falls back to its poll interval.
    fn observe(&self, container: ContainerId) -> Option<UnboundedReceiver<()>>;
}

/// Transport for the structured caption payload.
#[async_trait]
pub trait TrackPayloadSource: Send + Sync {
    /// GET the payload at `url` and return the response body
    async fn fetch_payload(&self, url: &str) -> Result<String, FetchError>;
}
