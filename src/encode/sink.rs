use crate::encode::pixel::FrameBgr24;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{PosevidError, PosevidResult};

/// Video compression scheme for the output container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// MPEG-4 Part 2 (`FMP4`). Built into every `ffmpeg`.
    #[default]
    Mpeg4,
    /// H.264 via `libx264`.
    H264,
}

impl VideoCodec {
    /// Encoder name as understood by `ffmpeg -c:v`.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::Mpeg4 => "mpeg4",
            Self::H264 => "libx264",
        }
    }
}

/// Configuration provided to a [`FrameSink`] when the output stream is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    pub codec: VideoCodec,
}

impl SinkConfig {
    pub fn validate(&self) -> PosevidResult<()> {
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(PosevidError::encoding("fps must be non-zero"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(PosevidError::encoding("width/height must be non-zero"));
        }
        Ok(())
    }

    /// Check a frame against the configured resolution.
    pub fn check_frame(&self, frame: &FrameBgr24) -> PosevidResult<()> {
        if frame.width != self.width || frame.height != self.height {
            return Err(PosevidError::encoding(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        if frame.data.len() != self.width as usize * self.height as usize * 3 {
            return Err(PosevidError::encoding(
                "frame.data size mismatch with width*height*3",
            ));
        }
        Ok(())
    }
}

/// Append-only consumer of encoded frames.
///
/// Lifecycle: `begin` once, `push_frame` any number of times in output order, then exactly one of
/// `end` (finalize) or `abort` (release without claiming success). Sinks never reorder frames; the
/// index is informational.
pub trait FrameSink {
    /// Open the output stream.
    fn begin(&mut self, cfg: SinkConfig) -> PosevidResult<()>;
    /// Append one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameBgr24) -> PosevidResult<()>;
    /// Finalize and flush the output.
    fn end(&mut self) -> PosevidResult<()>;
    /// Release resources after a failure. Must not leave output that looks complete.
    fn abort(&mut self) {}
}

/// How an [`InMemorySink`] was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkClose {
    Ended,
    Aborted,
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    closed: Option<SinkClose>,
    /// Frames in output order.
    pub(crate) frames: Vec<(FrameIndex, FrameBgr24)>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameBgr24)] {
        &self.frames
    }

    pub fn closed(&self) -> Option<SinkClose> {
        self.closed
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> PosevidResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg);
        self.closed = None;
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameBgr24) -> PosevidResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| PosevidError::encoding("sink not started"))?;
        if self.closed.is_some() {
            return Err(PosevidError::encoding("sink is already closed"));
        }
        cfg.check_frame(frame)?;
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> PosevidResult<()> {
        if self.cfg.is_none() {
            return Err(PosevidError::encoding("sink not started"));
        }
        if self.closed.is_some() {
            return Err(PosevidError::encoding("sink is already closed"));
        }
        self.closed = Some(SinkClose::Ended);
        Ok(())
    }

    fn abort(&mut self) {
        self.closed = Some(SinkClose::Aborted);
    }
}
