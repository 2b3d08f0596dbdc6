//! Composition strategies: how simultaneous track content becomes one frame.

use framecomp_core::{Frame, Result};

use crate::track::{Track, TrackKind};

/// Resolves which frame plays at time `t` across a stack of tracks.
///
/// The strategy drives the track queries itself so an implementation can
/// short-circuit without decoding lower-priority tracks. Returning
/// `Ok(None)` means no track has content at `t`; the timeline substitutes a
/// filler frame, so composition itself never fails on empty tracks.
pub trait CompositionStrategy {
    fn compose(&self, tracks: &mut [Track], t: f64) -> Result<Option<Frame>>;
}

/// The first track (lowest index) with a clip covering `t` wins outright.
///
/// No alpha blending: overlapping content on lower tracks is discarded.
/// This matches the original first-match behavior and is the extension
/// point a real blending strategy would replace.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstNonEmptyWins;

impl CompositionStrategy for FirstNonEmptyWins {
    fn compose(&self, tracks: &mut [Track], t: f64) -> Result<Option<Frame>> {
        for track in tracks
            .iter_mut()
            .filter(|track| track.kind() == TrackKind::Video)
        {
            if track.covers(t) {
                return track.frame_at(t).map(Some);
            }
        }
        Ok(None)
    }
}
