//! Frame payloads carried through the cache, tracks, and mux output.
//!
//! Buffers are shared via `Arc` so a cached frame and every clone handed to
//! callers refer to the same pixel/sample data.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Pixel format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (32 bits per pixel)
    #[default]
    Rgba8,
    /// YUV 4:2:0 planar
    Yuv420P,
}

impl PixelFormat {
    /// Number of planes for this format.
    pub fn plane_count(self) -> usize {
        match self {
            Self::Rgba8 => 1,
            Self::Yuv420P => 3,
        }
    }
}

/// A plane of pixel data.
#[derive(Debug, Clone)]
pub struct FramePlane {
    /// Raw pixel data
    pub data: Vec<u8>,
    /// Bytes per row
    pub stride: usize,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FramePlane {
    /// Create a zero-filled plane with the given dimensions.
    pub fn new(width: u32, height: u32, bytes_per_pixel: usize) -> Self {
        let stride = width as usize * bytes_per_pixel;
        Self {
            data: vec![0u8; stride * height as usize],
            stride,
            width,
            height,
        }
    }
}

/// A decoded video frame's pixel data in CPU memory.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Pixel format
    pub format: PixelFormat,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel data planes (1-3 depending on format)
    pub planes: SmallVec<[FramePlane; 3]>,
}

impl FrameBuffer {
    /// Create a new zero-filled frame buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let planes = match format {
            PixelFormat::Rgba8 => {
                smallvec::smallvec![FramePlane::new(width, height, 4)]
            }
            PixelFormat::Yuv420P => {
                smallvec::smallvec![
                    FramePlane::new(width, height, 1),
                    FramePlane::new(width / 2, height / 2, 1),
                    FramePlane::new(width / 2, height / 2, 1),
                ]
            }
        };
        Self {
            format,
            width,
            height,
            planes,
        }
    }

    /// Create a solid-color RGBA frame.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut buffer = Self::new(width, height, PixelFormat::Rgba8);
        for chunk in buffer.planes[0].data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&rgba);
        }
        buffer
    }

    /// Create an opaque black RGBA frame, used as filler for uncovered time.
    pub fn black(width: u32, height: u32) -> Self {
        Self::solid(width, height, [0, 0, 0, 255])
    }

    /// Total memory usage of this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.planes.iter().map(|p| p.data.len()).sum()
    }
}

/// Arc-wrapped frame buffer for shared ownership.
pub type SharedFrameBuffer = Arc<FrameBuffer>;

/// Decoded audio sample data (interleaved f32).
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Samples per second
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Interleaved samples, `sample_count * channels` values
    pub data: Vec<f32>,
}

impl AudioBuffer {
    /// Create a silent buffer holding `samples` samples per channel.
    pub fn silence(samples: u32, sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            data: vec![0.0; samples as usize * channels as usize],
        }
    }

    /// Samples per channel in this buffer.
    pub fn sample_count(&self) -> u32 {
        if self.channels == 0 {
            return 0;
        }
        (self.data.len() / self.channels as usize) as u32
    }
}

/// Arc-wrapped audio buffer for shared ownership.
pub type SharedAudioBuffer = Arc<AudioBuffer>;

/// A decoded video frame with timing metadata.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Presentation timestamp in stream time-base ticks.
    /// `None` for non-presentable frames; these never enter the cache.
    pub pts: Option<i64>,
    /// True only for frames that can seed independent decoding.
    pub keyframe: bool,
    /// Pixel data, shared between cache and consumers.
    pub buffer: SharedFrameBuffer,
}

/// A decoded audio frame with timing metadata.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Presentation timestamp in stream time-base ticks.
    pub pts: Option<i64>,
    /// Samples per channel contained in this frame. Drives the pts of the
    /// next emitted audio frame during muxing.
    pub samples: u32,
    /// Sample data, shared between cache and consumers.
    pub buffer: SharedAudioBuffer,
}

/// A decoded media unit, video or audio.
#[derive(Debug, Clone)]
pub enum Frame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl Frame {
    /// Presentation timestamp, if the frame carries one.
    #[inline]
    pub fn pts(&self) -> Option<i64> {
        match self {
            Frame::Video(f) => f.pts,
            Frame::Audio(f) => f.pts,
        }
    }

    /// Whether this frame can seed independent decoding.
    /// Audio frames are always sync points.
    #[inline]
    pub fn is_keyframe(&self) -> bool {
        match self {
            Frame::Video(f) => f.keyframe,
            Frame::Audio(_) => true,
        }
    }

    /// Samples per channel, for audio frames.
    #[inline]
    pub fn samples(&self) -> Option<u32> {
        match self {
            Frame::Video(_) => None,
            Frame::Audio(f) => Some(f.samples),
        }
    }

    #[inline]
    pub fn is_video(&self) -> bool {
        matches!(self, Frame::Video(_))
    }

    #[inline]
    pub fn is_audio(&self) -> bool {
        matches!(self, Frame::Audio(_))
    }

    /// Copy of this frame with its pts rewritten, sharing the same buffer.
    /// Used when remapping timestamps onto an output stream.
    pub fn with_pts(&self, pts: i64) -> Frame {
        match self {
            Frame::Video(f) => Frame::Video(VideoFrame {
                pts: Some(pts),
                ..f.clone()
            }),
            Frame::Audio(f) => Frame::Audio(AudioFrame {
                pts: Some(pts),
                ..f.clone()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_frame_is_opaque() {
        let buffer = FrameBuffer::black(8, 4);
        assert_eq!(buffer.memory_size(), 8 * 4 * 4);
        assert_eq!(&buffer.planes[0].data[0..4], &[0, 0, 0, 255]);
    }

    #[test]
    fn yuv420p_plane_layout() {
        let buffer = FrameBuffer::new(16, 8, PixelFormat::Yuv420P);
        assert_eq!(buffer.planes.len(), 3);
        assert_eq!(buffer.planes[1].width, 8);
        assert_eq!(buffer.planes[2].height, 4);
    }

    #[test]
    fn silence_sample_count() {
        let buffer = AudioBuffer::silence(1024, 48000, 2);
        assert_eq!(buffer.sample_count(), 1024);
        assert_eq!(buffer.data.len(), 2048);
    }

    #[test]
    fn with_pts_shares_buffer() {
        let frame = Frame::Video(VideoFrame {
            pts: Some(1000),
            keyframe: true,
            buffer: Arc::new(FrameBuffer::black(4, 4)),
        });
        let remapped = frame.with_pts(0);
        assert_eq!(remapped.pts(), Some(0));
        match (&frame, &remapped) {
            (Frame::Video(a), Frame::Video(b)) => {
                assert!(Arc::ptr_eq(&a.buffer, &b.buffer));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn audio_frames_are_sync_points() {
        let frame = Frame::Audio(AudioFrame {
            pts: Some(0),
            samples: 512,
            buffer: Arc::new(AudioBuffer::silence(512, 48000, 2)),
        });
        assert!(frame.is_keyframe());
        assert_eq!(frame.samples(), Some(512));
    }
}
