//! The timeline: multi-track composition and the render loop.

use framecomp_core::{
    Frame, FrameRate, FramecompError, Result, SharedFrameBuffer, TimeBase, TimeMap, VideoFrame,
};
use framecomp_core::FrameBuffer;
use framecomp_media::{FrameCache, FrameSink};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::compose::{CompositionStrategy, FirstNonEmptyWins};
use crate::track::{FillerSpec, Track, TrackKind};

/// Output stream configuration for composition and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    /// Time base of the output video stream.
    pub video_time_base: TimeBase,
    /// Time base of the output audio stream.
    pub audio_time_base: TimeBase,
    pub audio_sample_rate: u32,
    pub channels: u16,
}

impl RenderSettings {
    /// 1080p30 with 48 kHz stereo audio.
    pub fn hd() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: FrameRate::FPS_30,
            video_time_base: TimeBase::TICKS_30K,
            audio_time_base: TimeBase::TICKS_48K,
            audio_sample_rate: 48000,
            channels: 2,
        }
    }

    /// Output tick length in seconds (one video frame).
    pub fn tick(&self) -> f64 {
        self.frame_rate.interval()
    }

    fn filler(&self) -> FillerSpec {
        FillerSpec {
            width: self.width,
            height: self.height,
            sample_rate: self.audio_sample_rate,
            channels: self.channels,
            samples_per_tick: (self.audio_sample_rate as f64 * self.tick()).round() as u32,
        }
    }

    fn video_map(&self) -> Result<TimeMap> {
        TimeMap::new(self.video_time_base, self.frame_rate)
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::hd()
    }
}

/// Progress of an in-flight render.
#[derive(Debug, Clone, Copy)]
pub struct RenderProgress {
    /// Ticks completed so far.
    pub current_frame: u64,
    /// Total ticks in the render.
    pub total_frames: u64,
}

impl RenderProgress {
    /// Completion fraction (0.0 to 1.0).
    pub fn fraction(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.current_frame as f64 / self.total_frames as f64
    }
}

/// Counts of frames submitted by a completed render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub video_frames: u64,
    pub audio_frames: u64,
}

/// A stack of tracks addressable by one wall-clock axis. Lower track index
/// means higher composition priority.
pub struct Timeline {
    settings: RenderSettings,
    tracks: Vec<Track>,
    strategy: Box<dyn CompositionStrategy>,
    filler: FillerSpec,
    /// Black output-sized buffer shared across filler ticks.
    filler_buffer: SharedFrameBuffer,
}

impl Timeline {
    /// A timeline with the built-in first-non-empty-wins composition.
    pub fn new(settings: RenderSettings) -> Self {
        Self::with_strategy(settings, Box::new(FirstNonEmptyWins))
    }

    /// A timeline with a caller-provided composition strategy.
    pub fn with_strategy(settings: RenderSettings, strategy: Box<dyn CompositionStrategy>) -> Self {
        let filler = settings.filler();
        let filler_buffer = Arc::new(FrameBuffer::black(settings.width, settings.height));
        Self {
            settings,
            tracks: Vec::new(),
            strategy,
            filler,
            filler_buffer,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Append an empty track, returning its index.
    pub fn add_track(&mut self, kind: TrackKind) -> usize {
        self.tracks.push(Track::new(kind, self.filler));
        self.tracks.len() - 1
    }

    /// Place a clip on the given track, creating tracks up to that index if
    /// needed (created tracks take the clip's kind).
    pub fn add_clip(&mut self, cache: FrameCache, start: f64, track_index: usize) -> Result<Uuid> {
        let kind = TrackKind::from(cache.info().kind);
        while self.tracks.len() <= track_index {
            self.tracks.push(Track::new(kind, self.filler));
        }
        self.tracks[track_index].add_clip(cache, start)
    }

    /// End of the composition: the maximum track end.
    pub fn end(&self) -> f64 {
        self.tracks.iter().map(Track::end).fold(0.0, f64::max)
    }

    /// The composed video frame at time `t`. Always produces a frame: when
    /// no track has content the output-sized black filler is returned.
    pub fn frame_at(&mut self, t: f64) -> Result<Frame> {
        if t < 0.0 {
            return Err(FramecompError::InvalidArgument(format!(
                "time must be non-negative, got {}",
                t
            )));
        }
        match self.strategy.compose(&mut self.tracks, t)? {
            Some(frame) => Ok(frame),
            None => Ok(Frame::Video(VideoFrame {
                pts: None,
                keyframe: true,
                buffer: self.filler_buffer.clone(),
            })),
        }
    }

    /// Audio frames for the tick starting at `t`: the first audio track
    /// covering `t` wins; empty when no track has audio there.
    pub fn audio_frames_at(&mut self, t: f64) -> Result<Vec<Frame>> {
        if t < 0.0 {
            return Err(FramecompError::InvalidArgument(format!(
                "time must be non-negative, got {}",
                t
            )));
        }
        let tick = self.settings.tick();
        for track in self
            .tracks
            .iter_mut()
            .filter(|track| track.kind() == TrackKind::Audio)
        {
            if track.covers(t) {
                return track.frames_for_tick(t, tick);
            }
        }
        Ok(Vec::new())
    }

    /// Render `[start, end)` into `sink`.
    pub fn render(&mut self, sink: &mut dyn FrameSink, start: f64, end: f64) -> Result<RenderReport> {
        self.render_with_progress(sink, start, end, |_| {})
    }

    /// Render `[start, end)` into `sink`, reporting progress every ten ticks
    /// and on the final tick.
    ///
    /// Per tick: compose the video frame, rewrite its pts onto the output
    /// video time base by frame counter; fetch the tick's audio frames and
    /// rewrite each pts to the running sum of previously emitted sample
    /// counts. Any error aborts the whole render; on success both streams
    /// are flushed with a `None` sentinel.
    pub fn render_with_progress(
        &mut self,
        sink: &mut dyn FrameSink,
        start: f64,
        end: f64,
        mut on_progress: impl FnMut(RenderProgress),
    ) -> Result<RenderReport> {
        if start < 0.0 || start >= end {
            return Err(FramecompError::InvalidArgument(format!(
                "malformed render range [{}, {})",
                start, end
            )));
        }
        let video_map = self.settings.video_map()?;
        let tick = self.settings.tick();
        let total_frames = ((end - start) / tick).ceil() as u64;
        info!(start, end, total_frames, "starting render");

        let mut report = RenderReport::default();
        let mut audio_pts: i64 = 0;
        for frame_no in 0..total_frames {
            let t = start + frame_no as f64 * tick;

            // Sample video mid-tick: a tick start computed in f64 can land
            // one ulp below a source frame boundary, which would repeat the
            // previous frame and drop the current one.
            let video = self.frame_at(t + 0.5 * tick)?;
            let out_pts = video_map.index_to_pts(frame_no as i64);
            sink.write_video(Some(video.with_pts(out_pts)))?;
            report.video_frames += 1;

            for audio in self.audio_frames_at(t)? {
                let samples = audio.samples().unwrap_or(0);
                if samples == 0 {
                    continue;
                }
                sink.write_audio(Some(audio.with_pts(audio_pts)))?;
                audio_pts += samples as i64;
                report.audio_frames += 1;
            }

            if frame_no % 10 == 0 || frame_no + 1 == total_frames {
                on_progress(RenderProgress {
                    current_frame: frame_no + 1,
                    total_frames,
                });
            }
        }

        sink.write_video(None)?;
        sink.write_audio(None)?;
        debug!(
            video = report.video_frames,
            audio = report.audio_frames,
            "render flushed"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("tracks", &self.tracks.len())
            .field("end", &self.end())
            .finish()
    }
}
