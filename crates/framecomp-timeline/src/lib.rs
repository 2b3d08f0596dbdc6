//! Framecomp Timeline - multi-track composition over cached media streams.
//!
//! Implements the composition layer:
//! - Tracks holding clips on a shared wall-clock axis
//! - Pluggable composition strategies
//! - The timeline render loop with output timestamp remapping

pub mod compose;
pub mod timeline;
pub mod track;

pub use compose::{CompositionStrategy, FirstNonEmptyWins};
pub use timeline::{RenderProgress, RenderReport, RenderSettings, Timeline};
pub use track::{FillerSpec, PlacedClip, Track, TrackKind};
