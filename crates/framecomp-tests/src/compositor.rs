//! Integration tests for the composition subsystem.
//!
//! Exercises cross-crate interactions between framecomp-core,
//! framecomp-media, and framecomp-timeline: multi-track resolution, filler
//! behavior, and a full render into a recording sink.

use framecomp_core::FrameRate;
use framecomp_media::{FrameCache, MemorySink, SyntheticStream};
use framecomp_timeline::{RenderSettings, Timeline, TrackKind};

// ── Helpers ────────────────────────────────────────────────────

fn video_cache(frames: usize) -> FrameCache {
    FrameCache::open(Box::new(SyntheticStream::video(frames, 30))).unwrap()
}

fn audio_cache(frame_count: usize) -> FrameCache {
    let counts = vec![1600u32; frame_count];
    FrameCache::open(Box::new(SyntheticStream::audio(&counts, 48000))).unwrap()
}

fn small_settings() -> RenderSettings {
    RenderSettings {
        width: 16,
        height: 16,
        ..RenderSettings::hd()
    }
}

// ── Track resolution ───────────────────────────────────────────

#[test]
fn only_covering_track_supplies_the_frame() {
    let mut timeline = Timeline::new(small_settings());
    // Track 0 covers 4..8; track 1 is empty at t=5.
    timeline.add_clip(video_cache(120), 4.0, 0).unwrap();
    timeline.add_clip(video_cache(30), 20.0, 1).unwrap();

    let frame = timeline.frame_at(5.0).unwrap();
    assert_eq!(frame.pts(), Some(30_000));
}

#[test]
fn uncovered_time_never_fails() {
    let mut timeline = Timeline::new(small_settings());
    timeline.add_clip(video_cache(120), 4.0, 0).unwrap();
    timeline.add_clip(video_cache(30), 20.0, 1).unwrap();

    let frame = timeline.frame_at(100.0).unwrap();
    assert!(frame.is_video());
    assert_eq!(frame.pts(), None);
}

#[test]
fn audio_resolution_is_first_match() {
    let mut timeline = Timeline::new(small_settings());
    timeline.add_clip(video_cache(60), 0.0, 0).unwrap();
    timeline.add_clip(audio_cache(30), 0.0, 1).unwrap();

    assert!(!timeline.audio_frames_at(0.0).unwrap().is_empty());
    assert!(timeline.audio_frames_at(50.0).unwrap().is_empty());
}

// ── Full render ────────────────────────────────────────────────

#[test]
fn render_interleaves_video_and_audio() {
    let mut timeline = Timeline::new(small_settings());
    // 2 s of video and 1 s of audio (30 frames of 1600 samples at 48 kHz).
    timeline.add_clip(video_cache(60), 0.0, 0).unwrap();
    timeline.add_clip(audio_cache(30), 0.0, 1).unwrap();

    let mut sink = MemorySink::new();
    let report = timeline.render(&mut sink, 0.0, 2.0).unwrap();

    assert_eq!(report.video_frames, 60);
    assert_eq!(report.audio_frames, 30);

    // Video pts step by the output frame interval.
    let video_pts = sink.video_pts();
    assert!(video_pts.windows(2).all(|p| p[1] == p[0] + 1000));

    // Audio pts accumulate emitted sample counts.
    let audio_pts = sink.audio_pts();
    assert!(audio_pts.windows(2).all(|p| p[1] == p[0] + 1600));

    assert!(sink.video_flushed());
    assert!(sink.audio_flushed());
}

#[test]
fn render_covers_gaps_with_filler() {
    let mut timeline = Timeline::new(small_settings());
    // A 1 s clip placed at 1.0 inside a 3 s render window.
    timeline.add_clip(video_cache(30), 1.0, 0).unwrap();

    let mut sink = MemorySink::new();
    let report = timeline.render(&mut sink, 0.0, 3.0).unwrap();

    // Every tick produced a frame, covered or not.
    assert_eq!(report.video_frames, 90);
    assert_eq!(sink.video_pts().len(), 90);
}

#[test]
fn explicit_tracks_keep_their_kind() {
    let mut timeline = Timeline::new(small_settings());
    let video_index = timeline.add_track(TrackKind::Video);
    let audio_index = timeline.add_track(TrackKind::Audio);

    assert!(timeline
        .add_clip(audio_cache(10), 0.0, video_index)
        .is_err());
    assert!(timeline.add_clip(audio_cache(10), 0.0, audio_index).is_ok());
    assert_eq!(timeline.tracks().len(), 2);
    assert_eq!(
        timeline.tracks()[audio_index].kind(),
        TrackKind::Audio
    );
}

#[test]
fn frame_rate_change_rescales_output_pts() {
    let mut settings = small_settings();
    settings.frame_rate = FrameRate::FPS_60;
    let mut timeline = Timeline::new(settings);
    timeline.add_clip(video_cache(60), 0.0, 0).unwrap();

    let mut sink = MemorySink::new();
    let report = timeline.render(&mut sink, 0.0, 1.0).unwrap();

    // 60 output ticks over one second, 500 ticks apart on a 1/30000 base.
    assert_eq!(report.video_frames, 60);
    let pts = sink.video_pts();
    assert!(pts.windows(2).all(|p| p[1] == p[0] + 500));
}
