//! Interface to the external demux/decode/seek library.
//!
//! The actual container parsing and codec work is an external collaborator;
//! this module defines the contract framecomp consumes, plus [`StreamCursor`],
//! an owned wrapper that keeps the stateful seek-then-decode protocol from
//! being interleaved by accident.

use framecomp_core::{Frame, FrameRate, Result, TimeBase};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Demux-level packet metadata. No payload; packets are only inspected for
/// timing and sync-point information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Presentation timestamp, if the container recorded one.
    pub pts: Option<i64>,
    /// Whether this packet is a keyframe / sync point.
    pub keyframe: bool,
}

/// Stream content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    Video,
    Audio,
}

/// Probed metadata for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub kind: StreamKind,
    /// Seconds per pts tick.
    pub time_base: TimeBase,
    /// Nominal frame cadence. For audio this is
    /// `sample_rate / samples_per_frame`.
    pub frame_rate: FrameRate,
    /// Stream duration in seconds.
    pub duration_secs: f64,
    /// Video dimensions; zero for audio streams.
    pub width: u32,
    pub height: u32,
    /// Audio sample rate; zero for video streams.
    pub sample_rate: u32,
}

/// One demuxable, decodable, seekable stream. Implemented by the external
/// media library (or by a synthetic source in tests).
///
/// `seek` followed by `next_frame` is a stateful two-step protocol against a
/// single read cursor; implementations are not expected to tolerate
/// concurrent callers.
pub trait MediaStream {
    /// Stream metadata, available without decoding.
    fn info(&self) -> StreamInfo;

    /// Next packet in a sequential demux scan, `None` at end of stream.
    /// Cheap: no frame decoding.
    fn next_packet(&mut self) -> Result<Option<Packet>>;

    /// Reposition the read cursor to the nearest decodable point at or
    /// before `pts`. Subsequent decoding resumes from there.
    fn seek(&mut self, pts: i64) -> Result<()>;

    /// Decode the next frame from the current cursor position, `None` at
    /// end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Exclusive owner of one [`MediaStream`].
///
/// Exposes exactly two traversals: a full packet scan (for keyframe
/// indexing, resets the cursor afterwards) and [`seek_and_decode_from`],
/// which pairs the seek with the decode run it sets up.
///
/// [`seek_and_decode_from`]: StreamCursor::seek_and_decode_from
pub struct StreamCursor {
    inner: Box<dyn MediaStream>,
}

impl StreamCursor {
    pub fn new(inner: Box<dyn MediaStream>) -> Self {
        Self { inner }
    }

    /// Stream metadata.
    pub fn info(&self) -> StreamInfo {
        self.inner.info()
    }

    /// Demux the entire stream once, then reset the cursor to the start so
    /// subsequent decoding starts clean.
    pub fn scan_packets(&mut self) -> Result<Vec<Packet>> {
        let mut packets = Vec::new();
        while let Some(packet) = self.inner.next_packet()? {
            packets.push(packet);
        }
        debug!(packets = packets.len(), "packet scan complete, resetting cursor");
        self.inner.seek(0)?;
        Ok(packets)
    }

    /// Seek to `pts` and return a finite, non-restartable iterator over the
    /// frames decoded forward from there. A consumed run cannot be rewound;
    /// a fresh call re-seeks.
    pub fn seek_and_decode_from(&mut self, pts: i64) -> Result<DecodeRun<'_>> {
        self.inner.seek(pts)?;
        Ok(DecodeRun {
            stream: self.inner.as_mut(),
        })
    }
}

impl std::fmt::Debug for StreamCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCursor")
            .field("info", &self.inner.info())
            .finish()
    }
}

/// Sequential decode traversal started by [`StreamCursor::seek_and_decode_from`].
///
/// Frames without a pts are non-presentable or malformed; they are dropped
/// here and never reach the cache or time conversions. Each yielded frame is
/// paired with its pts, so downstream code never re-checks presence.
pub struct DecodeRun<'a> {
    stream: &'a mut dyn MediaStream,
}

impl Iterator for DecodeRun<'_> {
    type Item = Result<(i64, Frame)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stream.next_frame() {
                Ok(Some(frame)) => match frame.pts() {
                    Some(pts) => return Some(Ok((pts, frame))),
                    None => {
                        trace!("dropping decoded frame without pts");
                        continue;
                    }
                },
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
