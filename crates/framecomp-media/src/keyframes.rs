//! Keyframe discovery via packet-level scanning.
//!
//! Finding where decoding can start does not require decoding anything:
//! one demux pass over the stream records the pts of every sync point.

use framecomp_core::{FramecompError, Result, TimeMap};
use tracing::{debug, warn};

use crate::source::StreamCursor;

/// Ordered table of keyframe pts values for one stream.
///
/// Built once at cache construction and immutable afterwards. The recorded
/// pts values are strictly ascending.
#[derive(Debug, Clone)]
pub struct KeyframeIndex {
    entries: Vec<i64>,
}

impl KeyframeIndex {
    /// Scan the stream's packets, record every keyframe pts in encounter
    /// order, and reset the cursor to the start of the stream.
    ///
    /// Packets without a pts and keyframes that would break strict ascent
    /// (malformed input) are skipped with a warning.
    pub fn scan(cursor: &mut StreamCursor) -> Result<Self> {
        let mut entries: Vec<i64> = Vec::new();
        for packet in cursor.scan_packets()? {
            if !packet.keyframe {
                continue;
            }
            let Some(pts) = packet.pts else {
                warn!("skipping keyframe packet without pts");
                continue;
            };
            if let Some(&last) = entries.last() {
                if pts <= last {
                    warn!(pts, last, "skipping non-ascending keyframe pts");
                    continue;
                }
            }
            entries.push(pts);
        }
        debug!(keyframes = entries.len(), "keyframe scan complete");
        Ok(Self { entries })
    }

    /// The greatest recorded keyframe pts that is `<= pts`.
    ///
    /// Fails with `NotFound` when no keyframe exists at or before `pts`
    /// (empty stream, or a pts before the first sync point); callers may
    /// treat that as "decode from position 0".
    pub fn nearest_at_or_before(&self, pts: i64) -> Result<i64> {
        let idx = self.entries.partition_point(|&k| k <= pts);
        if idx == 0 {
            return Err(FramecompError::NotFound(format!(
                "no keyframe at or before pts {}",
                pts
            )));
        }
        Ok(self.entries[idx - 1])
    }

    /// Recorded keyframe pts values, ascending.
    pub fn entries(&self) -> &[i64] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Successive pts gaps between consecutive keyframes.
    pub fn intervals(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.windows(2).map(|pair| pair[1] - pair[0])
    }

    /// The largest inter-keyframe interval expressed as a frame count,
    /// rounded up. `None` when fewer than two keyframes were recorded.
    ///
    /// This is the smallest cache size that can hold one full decode run
    /// between consecutive sync points.
    pub fn max_interval_frames(&self, time: &TimeMap) -> Option<usize> {
        self.intervals().max().map(|gap| {
            let seconds = time.time_base().pts_to_seconds(gap);
            (seconds * time.frame_rate().to_fps_f64()).ceil() as usize
        })
    }
}
