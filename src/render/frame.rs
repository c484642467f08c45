use crate::foundation::core::FrameIndex;

/// A rendered frame as RGBA8 pixels.
///
/// Frames leave the CPU rasterizer with **premultiplied alpha**; the `premultiplied` flag makes
/// that explicit at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// RGBA bytes of the pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// One record's worth of output: the pixels plus what went into them.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    pub index: FrameIndex,
    pub pixels: FrameRGBA,
    /// Markers (dot plus optional label) drawn into `pixels`.
    pub markers: usize,
}
