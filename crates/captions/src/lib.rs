//! ReelKit Captions
//!
//! Caption tracks for the live preview:
//! - **SRT:** Resilient parsing of cue blocks and normalised re-serialisation
//! - **Loader:** Fetching caption files by URL with a TTL cache
//!
//! Captions never fail playback. A track that cannot be fetched is simply
//! empty, and a malformed cue is skipped without affecting its neighbours.

pub mod loader;
pub mod srt;

pub use loader::{CaptionLoader, CaptionSource, HttpCaptionSource};
pub use srt::{cue_at, format_srt, parse_srt, CaptionCue};
