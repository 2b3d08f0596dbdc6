//! Framecomp Media - keyframe-indexed frame caching over external streams.
//!
//! This crate provides:
//! - The interface consumed from the external demux/decode/seek library
//! - Keyframe discovery via packet scanning
//! - The bounded, FIFO-evicting random-access frame cache
//! - The muxer-side sink interface
//! - Synthetic streams for tests and examples

pub mod cache;
pub mod keyframes;
pub mod sink;
pub mod source;
pub mod synth;

pub use cache::{CacheStats, FrameCache, FrameRange, DEFAULT_CAPACITY};
pub use keyframes::KeyframeIndex;
pub use sink::{FrameSink, MemorySink};
pub use source::{DecodeRun, MediaStream, Packet, StreamCursor, StreamInfo, StreamKind};
pub use synth::{CallCounters, SyntheticStream};
