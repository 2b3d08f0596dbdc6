//! Synthetic in-memory media streams.
//!
//! Deterministic [`MediaStream`] implementations for tests and examples:
//! video with a fixed GOP layout, audio with scripted per-frame sample
//! counts. Seek and decode calls are counted through a shared handle so a
//! test can observe what a cache did to its stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use framecomp_core::{
    AudioBuffer, AudioFrame, Frame, FrameBuffer, FrameRate, FramecompError, Result, TimeBase,
    TimeMap, VideoFrame,
};

use crate::source::{MediaStream, Packet, StreamInfo, StreamKind};

/// Shared seek/decode call counters for one [`SyntheticStream`].
#[derive(Debug, Clone, Default)]
pub struct CallCounters {
    seeks: Arc<AtomicU64>,
    decodes: Arc<AtomicU64>,
}

impl CallCounters {
    /// Number of `seek` calls observed so far.
    pub fn seeks(&self) -> u64 {
        self.seeks.load(Ordering::Relaxed)
    }

    /// Number of frames decoded so far.
    pub fn decodes(&self) -> u64 {
        self.decodes.load(Ordering::Relaxed)
    }
}

/// A scripted stream with deterministic timing.
pub struct SyntheticStream {
    info: StreamInfo,
    /// Pts of each frame in decode order.
    frame_pts: Vec<i64>,
    /// Per-frame sample counts (audio streams only).
    samples: Vec<u32>,
    /// Keyframe cadence in frames (video streams only).
    gop: usize,
    /// Read cursor, shared by the demux scan and the decoder.
    pos: usize,
    /// Frame positions whose decoded pts comes back unset.
    unset_pts: Vec<usize>,
    /// Frame position at which decoding fails.
    decode_error_at: Option<usize>,
    counters: CallCounters,
}

impl SyntheticStream {
    /// Video stream with `frame_count` frames, a keyframe every `gop`
    /// frames, a 1/30000 time base and 30 fps (1000 ticks per frame).
    pub fn video(frame_count: usize, gop: usize) -> Self {
        let time_base = TimeBase::new(1, 30000).expect("valid time base");
        Self::video_with_timing(frame_count, gop, time_base, FrameRate::FPS_30)
    }

    /// Video stream with explicit timing.
    pub fn video_with_timing(
        frame_count: usize,
        gop: usize,
        time_base: TimeBase,
        frame_rate: FrameRate,
    ) -> Self {
        let map = TimeMap::new(time_base, frame_rate).expect("valid timing");
        let frame_pts: Vec<i64> = (0..frame_count as i64).map(|i| map.index_to_pts(i)).collect();
        Self {
            info: StreamInfo {
                kind: StreamKind::Video,
                time_base,
                frame_rate,
                duration_secs: frame_count as f64 * frame_rate.interval(),
                width: 16,
                height: 16,
                sample_rate: 0,
            },
            frame_pts,
            samples: Vec::new(),
            gop: gop.max(1),
            pos: 0,
            unset_pts: Vec::new(),
            decode_error_at: None,
            counters: CallCounters::default(),
        }
    }

    /// Audio stream with the given per-frame sample counts. The time base is
    /// `1/sample_rate`, so source pts equal cumulative sample counts.
    pub fn audio(sample_counts: &[u32], sample_rate: u32) -> Self {
        let time_base = TimeBase::new(1, sample_rate.max(1) as i64).expect("valid time base");
        let nominal = sample_counts.first().copied().unwrap_or(1024);
        let mut frame_pts = Vec::with_capacity(sample_counts.len());
        let mut pts = 0i64;
        for &samples in sample_counts {
            frame_pts.push(pts);
            pts += samples as i64;
        }
        let total_samples: u64 = sample_counts.iter().map(|&s| s as u64).sum();
        Self {
            info: StreamInfo {
                kind: StreamKind::Audio,
                time_base,
                frame_rate: FrameRate::new(sample_rate, nominal),
                duration_secs: total_samples as f64 / sample_rate.max(1) as f64,
                width: 0,
                height: 0,
                sample_rate,
            },
            frame_pts,
            samples: sample_counts.to_vec(),
            gop: 1,
            pos: 0,
            unset_pts: Vec::new(),
            decode_error_at: None,
            counters: CallCounters::default(),
        }
    }

    /// Make the frame at `position` decode with an unset pts.
    pub fn with_unset_pts_at(mut self, position: usize) -> Self {
        self.unset_pts.push(position);
        self
    }

    /// Make decoding fail once the cursor reaches `position`.
    pub fn with_decode_error_at(mut self, position: usize) -> Self {
        self.decode_error_at = Some(position);
        self
    }

    /// Handle for observing seek/decode calls after the stream has been
    /// boxed into a cache.
    pub fn counters(&self) -> CallCounters {
        self.counters.clone()
    }

    fn is_keyframe(&self, position: usize) -> bool {
        match self.info.kind {
            StreamKind::Video => position % self.gop == 0,
            StreamKind::Audio => true,
        }
    }

    fn decode_payload(&self, position: usize) -> Frame {
        let pts = if self.unset_pts.contains(&position) {
            None
        } else {
            Some(self.frame_pts[position])
        };
        match self.info.kind {
            StreamKind::Video => Frame::Video(VideoFrame {
                pts,
                keyframe: self.is_keyframe(position),
                buffer: Arc::new(FrameBuffer::black(self.info.width, self.info.height)),
            }),
            StreamKind::Audio => {
                let samples = self.samples[position];
                Frame::Audio(AudioFrame {
                    pts,
                    samples,
                    buffer: Arc::new(AudioBuffer::silence(samples, self.info.sample_rate, 2)),
                })
            }
        }
    }
}

impl MediaStream for SyntheticStream {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn next_packet(&mut self) -> Result<Option<Packet>> {
        if self.pos >= self.frame_pts.len() {
            return Ok(None);
        }
        let packet = Packet {
            pts: Some(self.frame_pts[self.pos]),
            keyframe: self.is_keyframe(self.pos),
        };
        self.pos += 1;
        Ok(Some(packet))
    }

    fn seek(&mut self, pts: i64) -> Result<()> {
        self.counters.seeks.fetch_add(1, Ordering::Relaxed);
        // Latest frame at or before pts, aligned down to a sync point.
        let mut position = self.frame_pts.partition_point(|&p| p <= pts);
        position = position.saturating_sub(1);
        while position > 0 && !self.is_keyframe(position) {
            position -= 1;
        }
        self.pos = position;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.pos >= self.frame_pts.len() {
            return Ok(None);
        }
        if self.decode_error_at == Some(self.pos) {
            return Err(FramecompError::Decode(format!(
                "synthetic decode failure at frame {}",
                self.pos
            )));
        }
        self.counters.decodes.fetch_add(1, Ordering::Relaxed);
        let frame = self.decode_payload(self.pos);
        self.pos += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_pts_spacing() {
        let mut stream = SyntheticStream::video(4, 2);
        let mut pts = Vec::new();
        while let Some(packet) = stream.next_packet().unwrap() {
            pts.push(packet.pts.unwrap());
        }
        assert_eq!(pts, vec![0, 1000, 2000, 3000]);
    }

    #[test]
    fn seek_aligns_to_keyframe() {
        let mut stream = SyntheticStream::video(10, 5);
        stream.seek(7000).unwrap();
        // Frame 7 is not a sync point; position falls back to frame 5.
        let frame = stream.next_frame().unwrap().unwrap();
        assert_eq!(frame.pts(), Some(5000));
        assert!(frame.is_keyframe());
    }

    #[test]
    fn audio_pts_accumulate_samples() {
        let mut stream = SyntheticStream::audio(&[1024, 1024, 512], 48000);
        let mut pts = Vec::new();
        while let Some(frame) = stream.next_frame().unwrap() {
            pts.push(frame.pts().unwrap());
        }
        assert_eq!(pts, vec![0, 1024, 2048]);
    }

    #[test]
    fn decode_error_fires_at_position() {
        let mut stream = SyntheticStream::video(5, 5).with_decode_error_at(2);
        assert!(stream.next_frame().unwrap().is_some());
        assert!(stream.next_frame().unwrap().is_some());
        assert!(matches!(
            stream.next_frame(),
            Err(FramecompError::Decode(_))
        ));
    }
}
