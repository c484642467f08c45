//! Posevid turns pose-estimation keypoint tracks into marker animations.
//!
//! A run reads a CSV of per-frame keypoint coordinates, drops rows before the configured start
//! frame, draws a colored dot (and optionally a name label) for every detected keypoint, and
//! appends each frame to a video written by the system `ffmpeg`.
//!
//! - Describe the run with an [`AnimationConfig`]
//! - Create an [`AnimationSession`]
//! - Stream records into a [`FrameSink`] ([`FfmpegSink`] for files, [`InMemorySink`] for tests)
#![forbid(unsafe_code)]

mod foundation;

pub mod config;
pub mod encode;
pub mod pipeline;
pub mod records;
pub mod render;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, Point, Rgba8};
pub use crate::foundation::error::{PosevidError, PosevidResult};

pub use crate::config::{AnimationConfig, FontSource, KeypointSpec, posenet_keypoints};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::pixel::{FrameBgr24, frame_to_bgr24};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkClose, SinkConfig, VideoCodec};
pub use crate::pipeline::{AnimationSession, AnimationSessionOpts, RenderStats};
pub use crate::records::{FrameFilter, FrameRecord, RecordReader};
pub use crate::render::cpu::MarkerRenderer;
pub use crate::render::frame::{FrameRGBA, RenderedFrame};
