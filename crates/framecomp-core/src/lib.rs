//! Framecomp Core - Foundation types for the frame cache and timeline
//! compositor.
//!
//! This crate provides the fundamental types used throughout framecomp:
//! - Time representation (TimeBase, FrameRate, TimeMap)
//! - Frame payloads (FrameBuffer, AudioBuffer, Frame)
//! - Error taxonomy

pub mod error;
pub mod frame;
pub mod time;

pub use error::{FramecompError, Result};
pub use frame::{
    AudioBuffer, AudioFrame, Frame, FrameBuffer, FramePlane, PixelFormat, SharedAudioBuffer,
    SharedFrameBuffer, VideoFrame,
};
pub use time::{FrameRate, TimeBase, TimeMap};
