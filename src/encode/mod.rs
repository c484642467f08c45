//! Encoding sinks.
//!
//! Sinks consume frames in output order and are driven by `AnimationSession::render_records`.

/// `ffmpeg`-based sink (video output via system `ffmpeg`).
pub mod ffmpeg;
/// Renderer/encoder pixel layout conversion.
pub mod pixel;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
