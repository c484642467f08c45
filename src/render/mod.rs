//! Marker rendering.

/// CPU marker rasterizer.
pub mod cpu;
/// Rendered frame buffers.
pub mod frame;
pub(crate) mod text;
