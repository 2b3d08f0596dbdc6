//! Keyframe-indexed random-access frame cache over a sequential decoder.
//!
//! The cache is a bounded, insertion-ordered pts→frame map. A miss seeks to
//! the nearest keyframe at or before the target and decodes forward, storing
//! every frame it passes: decoding is sequential, so intermediate frames are
//! free byproducts that make nearby lookups cheap.
//!
//! Eviction is FIFO, not LRU: decode order and access order are highly
//! correlated in forward playback, and a frame re-requested after eviction
//! is simply re-decoded. Random-access workloads see more misses; that is an
//! accepted tradeoff.

use framecomp_core::{Frame, FramecompError, Result, TimeMap};
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::keyframes::KeyframeIndex;
use crate::source::{DecodeRun, MediaStream, StreamCursor, StreamInfo};

/// Cache capacity used when the stream has fewer than two keyframes.
pub const DEFAULT_CAPACITY: usize = 60;

/// Lookup and decode counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub decoded_frames: u64,
}

/// Bounded random-access cache over one media stream.
///
/// Owns the stream cursor exclusively: `seek` followed by decode is a
/// stateful protocol, so a cursor is never shared between caches.
pub struct FrameCache {
    cursor: StreamCursor,
    keyframes: KeyframeIndex,
    time: TimeMap,
    frames: IndexMap<i64, Frame>,
    capacity: usize,
    stats: CacheStats,
}

impl FrameCache {
    /// Open a cache over `source`, auto-sizing capacity to the maximum
    /// inter-keyframe interval (in frames) so one full decode run between
    /// sync points always fits. Falls back to [`DEFAULT_CAPACITY`] when the
    /// stream has fewer than two keyframes.
    pub fn open(source: Box<dyn MediaStream>) -> Result<Self> {
        Self::build(source, None)
    }

    /// Open a cache with an explicit capacity. Zero is rejected.
    pub fn with_capacity(source: Box<dyn MediaStream>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(FramecompError::InvalidArgument(
                "cache capacity must be at least 1".into(),
            ));
        }
        Self::build(source, Some(capacity))
    }

    fn build(source: Box<dyn MediaStream>, capacity: Option<usize>) -> Result<Self> {
        let mut cursor = StreamCursor::new(source);
        let info = cursor.info();
        let time = TimeMap::new(info.time_base, info.frame_rate)?;
        let keyframes = KeyframeIndex::scan(&mut cursor)?;
        let capacity = capacity.unwrap_or_else(|| {
            keyframes
                .max_interval_frames(&time)
                .unwrap_or(DEFAULT_CAPACITY)
                .max(1)
        });
        debug!(capacity, keyframes = keyframes.len(), "frame cache ready");
        Ok(Self {
            cursor,
            keyframes,
            time,
            frames: IndexMap::new(),
            capacity,
            stats: CacheStats::default(),
        })
    }

    /// Stream metadata.
    pub fn info(&self) -> StreamInfo {
        self.cursor.info()
    }

    /// The stream's time base / frame rate pairing.
    pub fn time(&self) -> &TimeMap {
        &self.time
    }

    /// The keyframe table built at construction.
    pub fn keyframes(&self) -> &KeyframeIndex {
        &self.keyframes
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of frames currently cached. Never exceeds `capacity`.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn contains_pts(&self, pts: i64) -> bool {
        self.frames.contains_key(&pts)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// The frame at the given frame index.
    pub fn frame_at_index(&mut self, index: i64) -> Result<Frame> {
        if index < 0 {
            return Err(FramecompError::InvalidArgument(format!(
                "frame index must be non-negative, got {}",
                index
            )));
        }
        let pts = self.time.index_to_pts(index);
        self.frame_at_pts(pts)
    }

    /// The frame playing at wall-clock time `t`.
    pub fn frame_at_time(&mut self, t: f64) -> Result<Frame> {
        if t < 0.0 {
            return Err(FramecompError::InvalidArgument(format!(
                "time must be non-negative, got {}",
                t
            )));
        }
        self.frame_at_index(self.time.t_to_index(t))
    }

    /// The first frame with pts `>= target`.
    ///
    /// Cache hit: returned directly, no decoder involvement. Miss: seek to
    /// the nearest keyframe at or before `target` (or the stream start when
    /// none exists) and decode forward, storing every frame passed, until
    /// the target is reached. `OutOfRange` when the stream ends first;
    /// decoder failures propagate and leave already-stored entries intact.
    pub fn frame_at_pts(&mut self, target: i64) -> Result<Frame> {
        if let Some(frame) = self.frames.get(&target) {
            self.stats.hits += 1;
            trace!(pts = target, "cache hit");
            return Ok(frame.clone());
        }
        self.stats.misses += 1;
        let start = match self.keyframes.nearest_at_or_before(target) {
            Ok(pts) => pts,
            // No sync point at or before the target: decode from the start.
            Err(FramecompError::NotFound(_)) => 0,
            Err(e) => return Err(e),
        };
        debug!(target, start, "cache miss, decoding forward from keyframe");
        let Self {
            cursor,
            frames,
            capacity,
            stats,
            ..
        } = self;
        let run = cursor.seek_and_decode_from(start)?;
        for item in run {
            let (pts, frame) = item?;
            stats.decoded_frames += 1;
            store(frames, *capacity, pts, frame.clone());
            if pts >= target {
                return Ok(frame);
            }
        }
        Err(FramecompError::OutOfRange(format!(
            "pts {} is beyond the end of the stream",
            target
        )))
    }

    /// Lazy retrieval of the frames with pts in `[start_t, end_t]`,
    /// ascending, yielding `(frame, wall time, frame index)`. Both bounds
    /// are converted to pts by round-to-nearest and a frame landing exactly
    /// on the end pts is included.
    ///
    /// When every pts of the window's nominal frame-index sequence is
    /// already cached, the range is served from the cache without touching
    /// the decoder. Otherwise one seek-and-decode-forward pass runs,
    /// populating the cache as a side effect; for streams with a non-uniform
    /// cadence (variable audio frame sizes) the decode pass is always taken.
    ///
    /// The returned iterator is finite and non-restartable; a fresh call
    /// re-seeks.
    pub fn frames_between(&mut self, start_t: f64, end_t: f64) -> Result<FrameRange<'_>> {
        if start_t < 0.0 || start_t >= end_t {
            return Err(FramecompError::InvalidArgument(format!(
                "malformed range [{}, {})",
                start_t, end_t
            )));
        }
        let start_pts = self.time.t_to_pts(start_t);
        let end_pts = self.time.t_to_pts(end_t);

        let mut expected = Vec::new();
        // First nominal frame at or after start_pts. Rounding keeps a wall
        // time sitting a float ulp below a frame boundary on that boundary's
        // frame instead of the previous one.
        let mut index = self.time.pts_to_index(start_pts);
        if self.time.index_to_pts(index) < start_pts {
            index += 1;
        }
        loop {
            let pts = self.time.index_to_pts(index);
            if pts > end_pts {
                break;
            }
            expected.push(pts);
            index += 1;
        }
        if !expected.is_empty() && expected.iter().all(|pts| self.frames.contains_key(pts)) {
            trace!(
                frames = expected.len(),
                "serving range [{}, {}) from cache",
                start_t,
                end_t
            );
            self.stats.hits += expected.len() as u64;
            let time = self.time;
            let items: Vec<(Frame, f64, i64)> = expected
                .iter()
                .map(|&pts| {
                    (
                        self.frames[&pts].clone(),
                        time.pts_to_t(pts),
                        time.pts_to_index(pts),
                    )
                })
                .collect();
            return Ok(FrameRange {
                inner: RangeInner::Cached(items.into_iter()),
            });
        }

        self.stats.misses += 1;
        let seek_to = match self.keyframes.nearest_at_or_before(start_pts) {
            Ok(pts) => pts,
            Err(FramecompError::NotFound(_)) => 0,
            Err(e) => return Err(e),
        };
        debug!(start_pts, end_pts, seek_to, "range miss, decoding forward");
        let Self {
            cursor,
            frames,
            capacity,
            stats,
            time,
            ..
        } = self;
        let run = cursor.seek_and_decode_from(seek_to)?;
        Ok(FrameRange {
            inner: RangeInner::Decode {
                run,
                frames,
                stats,
                capacity: *capacity,
                time: *time,
                start_pts,
                end_pts,
                done: false,
            },
        })
    }
}

impl std::fmt::Debug for FrameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCache")
            .field("capacity", &self.capacity)
            .field("len", &self.frames.len())
            .field("keyframes", &self.keyframes.len())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Insert one frame, evicting the oldest-inserted entries past capacity.
fn store(frames: &mut IndexMap<i64, Frame>, capacity: usize, pts: i64, frame: Frame) {
    frames.insert(pts, frame);
    while frames.len() > capacity {
        frames.shift_remove_index(0);
    }
}

/// Lazy frame range returned by [`FrameCache::frames_between`].
pub struct FrameRange<'a> {
    inner: RangeInner<'a>,
}

enum RangeInner<'a> {
    Cached(std::vec::IntoIter<(Frame, f64, i64)>),
    Decode {
        run: DecodeRun<'a>,
        frames: &'a mut IndexMap<i64, Frame>,
        stats: &'a mut CacheStats,
        capacity: usize,
        time: TimeMap,
        start_pts: i64,
        end_pts: i64,
        done: bool,
    },
}

impl Iterator for FrameRange<'_> {
    type Item = Result<(Frame, f64, i64)>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            RangeInner::Cached(items) => items.next().map(Ok),
            RangeInner::Decode {
                run,
                frames,
                stats,
                capacity,
                time,
                start_pts,
                end_pts,
                done,
            } => {
                if *done {
                    return None;
                }
                loop {
                    let (pts, frame) = match run.next() {
                        None => {
                            *done = true;
                            return None;
                        }
                        Some(Err(e)) => {
                            *done = true;
                            return Some(Err(e));
                        }
                        Some(Ok(item)) => item,
                    };
                    stats.decoded_frames += 1;
                    store(frames, *capacity, pts, frame.clone());
                    if pts > *end_pts {
                        *done = true;
                        return None;
                    }
                    if pts >= *start_pts {
                        return Some(Ok((frame, time.pts_to_t(pts), time.pts_to_index(pts))));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::SyntheticStream;

    #[test]
    fn rejects_zero_capacity() {
        let stream = SyntheticStream::video(10, 5);
        assert!(matches!(
            FrameCache::with_capacity(Box::new(stream), 0),
            Err(FramecompError::InvalidArgument(_))
        ));
    }

    #[test]
    fn capacity_auto_sized_from_keyframe_interval() {
        let cache = FrameCache::open(Box::new(SyntheticStream::video(90, 30))).unwrap();
        assert_eq!(cache.capacity(), 30);
    }

    #[test]
    fn capacity_defaults_without_keyframe_interval() {
        // Single keyframe: no interval to measure.
        let cache = FrameCache::open(Box::new(SyntheticStream::video(20, 30))).unwrap();
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let stream = SyntheticStream::video(120, 1);
        let mut cache = FrameCache::with_capacity(Box::new(stream), 5).unwrap();
        for index in 0..40 {
            cache.frame_at_index(index).unwrap();
            assert!(cache.len() <= 5);
        }
    }

    #[test]
    fn repeated_lookup_hits_without_decoding() {
        let stream = SyntheticStream::video(60, 30);
        let counters = stream.counters();
        let mut cache = FrameCache::open(Box::new(stream)).unwrap();

        let first = cache.frame_at_index(10).unwrap();
        let decodes_after_miss = counters.decodes();
        let seeks_after_miss = counters.seeks();

        let second = cache.frame_at_index(10).unwrap();
        assert_eq!(counters.decodes(), decodes_after_miss);
        assert_eq!(counters.seeks(), seeks_after_miss);

        // Both lookups return the identical payload.
        match (first, second) {
            (Frame::Video(a), Frame::Video(b)) => {
                assert!(std::sync::Arc::ptr_eq(&a.buffer, &b.buffer));
            }
            _ => unreachable!(),
        }
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn fifo_evicts_first_inserted() {
        // Every frame is a keyframe, so each request decodes exactly one.
        let stream = SyntheticStream::video(120, 1);
        let counters = stream.counters();
        let mut cache = FrameCache::with_capacity(Box::new(stream), 5).unwrap();

        for index in 0..6 {
            cache.frame_at_index(index).unwrap();
        }
        assert_eq!(counters.decodes(), 6);
        // The first-requested pts was evicted.
        assert!(!cache.contains_pts(0));
        assert!(cache.contains_pts(1000));

        // Re-requesting it triggers a fresh decode.
        cache.frame_at_index(0).unwrap();
        assert_eq!(counters.decodes(), 7);
    }

    #[test]
    fn miss_seeks_keyframe_and_decodes_forward() {
        // 120 frames, keyframe every 30: sync points at pts 0/30000/60000/90000.
        let stream = SyntheticStream::video(120, 30);
        let counters = stream.counters();
        let mut cache = FrameCache::with_capacity(Box::new(stream), 30).unwrap();
        let scan_seeks = counters.seeks();

        let frame = cache.frame_at_index(95).unwrap();
        assert_eq!(frame.pts(), Some(95_000));
        // One seek to the keyframe, six frames decoded (90..=95).
        assert_eq!(counters.seeks(), scan_seeks + 1);
        assert_eq!(counters.decodes(), 6);
        for pts in (90_000..=95_000).step_by(1000) {
            assert!(cache.contains_pts(pts));
        }
    }

    #[test]
    fn request_past_stream_end_is_out_of_range() {
        let mut cache = FrameCache::open(Box::new(SyntheticStream::video(120, 30))).unwrap();
        assert!(matches!(
            cache.frame_at_index(130),
            Err(FramecompError::OutOfRange(_))
        ));
    }

    #[test]
    fn negative_lookups_are_invalid() {
        let mut cache = FrameCache::open(Box::new(SyntheticStream::video(10, 5))).unwrap();
        assert!(matches!(
            cache.frame_at_index(-1),
            Err(FramecompError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.frame_at_time(-0.5),
            Err(FramecompError::InvalidArgument(_))
        ));
    }

    #[test]
    fn decode_error_leaves_stored_entries_intact() {
        let stream = SyntheticStream::video(30, 30).with_decode_error_at(3);
        let counters = stream.counters();
        let mut cache = FrameCache::open(Box::new(stream)).unwrap();

        assert!(matches!(
            cache.frame_at_index(5),
            Err(FramecompError::Decode(_))
        ));
        // Frames decoded before the failure stay cached and hit.
        assert!(cache.contains_pts(2000));
        let decodes = counters.decodes();
        cache.frame_at_pts(2000).unwrap();
        assert_eq!(counters.decodes(), decodes);
    }

    #[test]
    fn unset_pts_frames_are_skipped() {
        // Frame 2 decodes without a pts; the first presentable frame at or
        // after the target is returned instead.
        let stream = SyntheticStream::video(10, 1).with_unset_pts_at(2);
        let mut cache = FrameCache::open(Box::new(stream)).unwrap();
        let frame = cache.frame_at_index(2).unwrap();
        assert_eq!(frame.pts(), Some(3000));
        assert!(!cache.contains_pts(2000));
    }

    #[test]
    fn range_decodes_and_populates_cache() {
        let stream = SyntheticStream::video(120, 30);
        let mut cache = FrameCache::with_capacity(Box::new(stream), 100).unwrap();

        let items: Vec<_> = cache
            .frames_between(1.0, 1.2)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        // Indices 30..=36 at 30 fps, end boundary included.
        assert_eq!(items.len(), 7);
        assert_eq!(items[0].2, 30);
        assert_eq!(items[6].2, 36);
        assert!((items[0].1 - 1.0).abs() < 1e-9);
        assert!(cache.contains_pts(30_000));
        assert!(cache.contains_pts(36_000));
    }

    #[test]
    fn fully_cached_range_skips_decoder() {
        let stream = SyntheticStream::video(120, 30);
        let counters = stream.counters();
        let mut cache = FrameCache::with_capacity(Box::new(stream), 100).unwrap();

        cache.frames_between(1.0, 1.2).unwrap().count();
        let seeks = counters.seeks();
        let decodes = counters.decodes();

        let items: Vec<_> = cache
            .frames_between(1.0, 1.2)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items.len(), 7);
        assert_eq!(counters.seeks(), seeks);
        assert_eq!(counters.decodes(), decodes);
    }

    #[test]
    fn range_includes_frame_at_end_boundary() {
        let mut cache = FrameCache::open(Box::new(SyntheticStream::video(10, 1))).unwrap();
        let end = cache.time().pts_to_t(2000);
        let pts: Vec<i64> = cache
            .frames_between(0.0, end)
            .unwrap()
            .map(|item| item.unwrap().0.pts().unwrap())
            .collect();
        assert_eq!(pts, vec![0, 1000, 2000]);
    }

    #[test]
    fn range_start_snaps_to_nearest_frame_boundary() {
        // 31 * (1/30) in f64 lands one ulp below the exact boundary; the
        // range must still start at frame 31, not fall back to frame 30.
        let mut cache = FrameCache::open(Box::new(SyntheticStream::video(60, 1))).unwrap();
        let t = 31.0 * (1.0 / 30.0);
        let first = cache
            .frames_between(t, t + 1.0 / 30.0)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(first.0.pts(), Some(31_000));
        assert_eq!(first.2, 31);
    }

    #[test]
    fn malformed_range_is_invalid() {
        let mut cache = FrameCache::open(Box::new(SyntheticStream::video(10, 5))).unwrap();
        assert!(matches!(
            cache.frames_between(1.0, 1.0),
            Err(FramecompError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.frames_between(-1.0, 1.0),
            Err(FramecompError::InvalidArgument(_))
        ));
    }

    #[test]
    fn range_over_variable_audio_frames() {
        let stream = SyntheticStream::audio(&[1024, 1024, 512], 48000);
        let mut cache = FrameCache::open(Box::new(stream)).unwrap();
        let pts: Vec<i64> = cache
            .frames_between(0.0, 0.0625)
            .unwrap()
            .map(|item| item.unwrap().0.pts().unwrap())
            .collect();
        assert_eq!(pts, vec![0, 1024, 2048]);
    }
}
