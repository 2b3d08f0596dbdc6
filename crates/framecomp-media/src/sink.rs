//! Output side: the external muxer/writer contract.

use framecomp_core::{Frame, FramecompError, Result};

/// Destination for composed frames with remapped timestamps.
///
/// Implemented by the external muxer. Frames arrive in strictly increasing
/// pts order per stream; `None` signals end-of-stream and flushes. Writing
/// after a flush is a caller error.
pub trait FrameSink {
    /// Write one video frame, or flush the video stream with `None`.
    fn write_video(&mut self, frame: Option<Frame>) -> Result<()>;

    /// Write one audio frame, or flush the audio stream with `None`.
    fn write_audio(&mut self, frame: Option<Frame>) -> Result<()>;
}

/// In-memory sink that records everything written to it.
///
/// Useful as a render target in tests and for inspecting mux ordering
/// without a real container writer.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub video: Vec<Frame>,
    pub audio: Vec<Frame>,
    video_flushed: bool,
    audio_flushed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video_flushed(&self) -> bool {
        self.video_flushed
    }

    pub fn audio_flushed(&self) -> bool {
        self.audio_flushed
    }

    /// Pts values of the recorded video frames, in write order.
    pub fn video_pts(&self) -> Vec<i64> {
        self.video.iter().filter_map(|f| f.pts()).collect()
    }

    /// Pts values of the recorded audio frames, in write order.
    pub fn audio_pts(&self) -> Vec<i64> {
        self.audio.iter().filter_map(|f| f.pts()).collect()
    }
}

impl FrameSink for MemorySink {
    fn write_video(&mut self, frame: Option<Frame>) -> Result<()> {
        match frame {
            Some(frame) if self.video_flushed => Err(FramecompError::Mux(format!(
                "video frame with pts {:?} written after flush",
                frame.pts()
            ))),
            Some(frame) => {
                self.video.push(frame);
                Ok(())
            }
            None => {
                self.video_flushed = true;
                Ok(())
            }
        }
    }

    fn write_audio(&mut self, frame: Option<Frame>) -> Result<()> {
        match frame {
            Some(frame) if self.audio_flushed => Err(FramecompError::Mux(format!(
                "audio frame with pts {:?} written after flush",
                frame.pts()
            ))),
            Some(frame) => {
                self.audio.push(frame);
                Ok(())
            }
            None => {
                self.audio_flushed = true;
                Ok(())
            }
        }
    }
}
