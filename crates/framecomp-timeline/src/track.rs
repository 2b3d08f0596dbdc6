//! Tracks: one lane of clips on the shared wall-clock axis.

use framecomp_core::{
    AudioBuffer, AudioFrame, Frame, FrameBuffer, FramecompError, Result, VideoFrame,
};
use framecomp_media::{FrameCache, StreamKind};
use std::sync::Arc;
use uuid::Uuid;

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

impl From<StreamKind> for TrackKind {
    fn from(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Video => TrackKind::Video,
            StreamKind::Audio => TrackKind::Audio,
        }
    }
}

/// Parameters for synthesizing filler content (black video, silence) when
/// no clip covers a requested time.
#[derive(Debug, Clone, Copy)]
pub struct FillerSpec {
    pub width: u32,
    pub height: u32,
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel in one filler audio frame.
    pub samples_per_tick: u32,
}

impl FillerSpec {
    /// An opaque black video frame with no pts.
    pub fn video_frame(&self) -> Frame {
        Frame::Video(VideoFrame {
            pts: None,
            keyframe: true,
            buffer: Arc::new(FrameBuffer::black(self.width, self.height)),
        })
    }

    /// One tick of silence with no pts.
    pub fn audio_frame(&self) -> Frame {
        Frame::Audio(AudioFrame {
            pts: None,
            samples: self.samples_per_tick,
            buffer: Arc::new(AudioBuffer::silence(
                self.samples_per_tick,
                self.sample_rate,
                self.channels,
            )),
        })
    }

    /// The filler frame matching a track kind.
    pub fn frame_for(&self, kind: TrackKind) -> Frame {
        match kind {
            TrackKind::Video => self.video_frame(),
            TrackKind::Audio => self.audio_frame(),
        }
    }
}

/// A clip placed on a track at a wall-clock start time. Owns the frame
/// cache (and therefore the decoder cursor) for its source.
pub struct PlacedClip {
    pub id: Uuid,
    pub start: f64,
    cache: FrameCache,
}

impl PlacedClip {
    fn new(cache: FrameCache, start: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            cache,
        }
    }

    /// Clip duration, taken from the source stream.
    pub fn duration(&self) -> f64 {
        self.cache.info().duration_secs
    }

    /// Timeline time at which this clip ends.
    pub fn end(&self) -> f64 {
        self.start + self.duration()
    }

    /// Whether timeline time `t` falls inside this clip's visible range.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end()
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut FrameCache {
        &mut self.cache
    }
}

impl std::fmt::Debug for PlacedClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacedClip")
            .field("id", &self.id)
            .field("start", &self.start)
            .field("duration", &self.duration())
            .finish()
    }
}

/// One lane of clips. Clips are assumed non-overlapping within a lane;
/// overlap is not rejected here, but composition relies on it.
#[derive(Debug)]
pub struct Track {
    kind: TrackKind,
    clips: Vec<PlacedClip>,
    filler: FillerSpec,
}

impl Track {
    pub fn new(kind: TrackKind, filler: FillerSpec) -> Self {
        Self {
            kind,
            clips: Vec::new(),
            filler,
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Place a clip at `start`. The clip's stream kind must match the track.
    pub fn add_clip(&mut self, cache: FrameCache, start: f64) -> Result<Uuid> {
        if start < 0.0 {
            return Err(FramecompError::InvalidArgument(format!(
                "clip start must be non-negative, got {}",
                start
            )));
        }
        let clip_kind = TrackKind::from(cache.info().kind);
        if clip_kind != self.kind {
            return Err(FramecompError::InvalidArgument(format!(
                "cannot place a {:?} clip on a {:?} track",
                clip_kind, self.kind
            )));
        }
        let clip = PlacedClip::new(cache, start);
        let id = clip.id;
        self.clips.push(clip);
        Ok(id)
    }

    /// Whether any clip covers timeline time `t`.
    pub fn covers(&self, t: f64) -> bool {
        self.clips.iter().any(|clip| clip.contains(t))
    }

    /// The clip covering `t`, if any.
    pub fn clip_covering(&mut self, t: f64) -> Option<&mut PlacedClip> {
        self.clips.iter_mut().find(|clip| clip.contains(t))
    }

    /// The frame playing at timeline time `t`.
    ///
    /// When no clip covers `t` a filler frame is produced (black video or
    /// silence), so a track always has an answer.
    pub fn frame_at(&mut self, t: f64) -> Result<Frame> {
        if t < 0.0 {
            return Err(FramecompError::InvalidArgument(format!(
                "time must be non-negative, got {}",
                t
            )));
        }
        let kind = self.kind;
        let filler = self.filler;
        match self.clip_covering(t) {
            Some(clip) => {
                let local = t - clip.start;
                clip.cache_mut().frame_at_time(local)
            }
            None => Ok(filler.frame_for(kind)),
        }
    }

    /// All frames the covering clip plays in `[t, t + tick)`. Empty when no
    /// clip covers `t`. Used for audio lanes, where frame cadence does not
    /// match the output tick.
    pub fn frames_for_tick(&mut self, t: f64, tick: f64) -> Result<Vec<Frame>> {
        let Some(clip) = self.clip_covering(t) else {
            return Ok(Vec::new());
        };
        let local = t - clip.start;
        let end = local + tick;
        // A frame landing exactly on the window's end belongs to the next
        // tick, not this one.
        let end_pts = clip.cache().time().t_to_pts(end);
        let mut frames = Vec::new();
        for item in clip.cache_mut().frames_between(local, end)? {
            let (frame, _, _) = item?;
            if frame.pts() == Some(end_pts) {
                break;
            }
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Maximum over all clips of their end time; 0 for an empty track.
    pub fn end(&self) -> f64 {
        self.clips.iter().map(|clip| clip.end()).fold(0.0, f64::max)
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn clips(&self) -> &[PlacedClip] {
        &self.clips
    }
}
