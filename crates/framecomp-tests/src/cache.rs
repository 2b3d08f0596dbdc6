//! Integration tests for the cache subsystem.
//!
//! Exercises the full miss path across framecomp-core and framecomp-media:
//! keyframe scan, seek, decode-forward, eviction, and time conversions on a
//! synthetic GOP layout.

use framecomp_core::{FrameRate, TimeBase, TimeMap};
use framecomp_media::{FrameCache, SyntheticStream};

// ── Helpers ────────────────────────────────────────────────────

/// 180 frames at 30 fps over a 1/30000 time base, keyframe every 30 frames:
/// sync points at pts 0, 30000, 60000, 90000, 120000, 150000.
fn gop_stream() -> SyntheticStream {
    SyntheticStream::video(180, 30)
}

fn time_map() -> TimeMap {
    let tb = TimeBase::new(1, 30000).unwrap();
    TimeMap::new(tb, FrameRate::FPS_30).unwrap()
}

// ── End-to-end miss path ───────────────────────────────────────

#[test]
fn seek_decode_forward_scenario() {
    let stream = gop_stream();
    let counters = stream.counters();
    let mut cache = FrameCache::with_capacity(Box::new(stream), 30).unwrap();
    let seeks_after_scan = counters.seeks();

    // Frame index 95 sits five frames past the keyframe at pts 90000.
    let frame = cache.frame_at_index(95).unwrap();

    assert_eq!(frame.pts(), Some(time_map().index_to_pts(95)));
    assert_eq!(counters.seeks(), seeks_after_scan + 1);
    assert_eq!(counters.decodes(), 6);
    assert_eq!(cache.len(), 6);
    for index in 90..=95 {
        assert!(cache.contains_pts(time_map().index_to_pts(index)));
    }
}

#[test]
fn decode_run_byproducts_serve_earlier_frames() {
    let stream = gop_stream();
    let counters = stream.counters();
    // Auto-sized capacity: one full GOP (30 frames).
    let mut cache = FrameCache::open(Box::new(stream)).unwrap();
    assert_eq!(cache.capacity(), 30);

    // One miss at the end of the first GOP decodes the whole run.
    cache.frame_at_index(29).unwrap();
    assert_eq!(counters.decodes(), 30);

    // Every frame the run passed over is now a hit.
    for index in 0..29 {
        let frame = cache.frame_at_index(index).unwrap();
        assert_eq!(frame.pts(), Some(time_map().index_to_pts(index)));
    }
    assert_eq!(counters.decodes(), 30);
    assert_eq!(cache.stats().hits, 29);
}

#[test]
fn wall_clock_lookup_matches_index_lookup() {
    let mut cache = FrameCache::open(Box::new(gop_stream())).unwrap();
    let by_time = cache.frame_at_time(3.19).unwrap();
    let by_index = cache.frame_at_index(95).unwrap();
    assert_eq!(by_time.pts(), by_index.pts());
}

#[test]
fn random_access_stays_bounded() {
    let mut cache = FrameCache::with_capacity(Box::new(gop_stream()), 10).unwrap();
    for index in [0, 95, 40, 170, 5, 95, 120, 60] {
        let frame = cache.frame_at_index(index).unwrap();
        assert!(frame.pts().unwrap() >= time_map().index_to_pts(index));
        assert!(cache.len() <= 10);
    }
}
