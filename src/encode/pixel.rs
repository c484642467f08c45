//! Channel-order conversion between the rasterizer and the encoder.
//!
//! The rasterizer produces premultiplied RGBA8; the encoder consumes packed, opaque BGR24.

use crate::foundation::error::{PosevidError, PosevidResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;

/// A frame in the encoder's input layout: 3 bytes per pixel, `[b, g, r]`, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBgr24 {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameBgr24 {
    /// `[b, g, r]` bytes of the pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.data.get(i..i + 3)?;
        Some([px[0], px[1], px[2]])
    }
}

/// Flatten a rendered frame over `bg_rgba` and reorder its channels into BGR24.
pub fn frame_to_bgr24(frame: &FrameRGBA, bg_rgba: [u8; 4]) -> PosevidResult<FrameBgr24> {
    let mut data = Vec::new();
    rgba_to_bgr24(&mut data, frame, bg_rgba)?;
    Ok(FrameBgr24 {
        width: frame.width,
        height: frame.height,
        data,
    })
}

/// Like [`frame_to_bgr24`], writing into a reusable buffer.
pub fn rgba_to_bgr24(dst: &mut Vec<u8>, frame: &FrameRGBA, bg_rgba: [u8; 4]) -> PosevidResult<()> {
    let px_count = frame.width as usize * frame.height as usize;
    if frame.data.len() != px_count * 4 {
        return Err(PosevidError::encoding(format!(
            "frame data length {} does not match {}x{} rgba8",
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    dst.clear();
    dst.reserve(px_count * 3);
    for s in frame.data.chunks_exact(4) {
        let [r, g, b] = if frame.premultiplied {
            flatten_premul_px(s, bg_rgba)
        } else {
            flatten_straight_px(s, bg_rgba)
        };
        dst.extend_from_slice(&[b, g, r]);
    }
    Ok(())
}

/// Flatten premultiplied RGBA8 over an opaque background into opaque straight RGBA8.
pub fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> PosevidResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(PosevidError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let [r, g, b] = flatten_premul_px(s, bg_rgba);
        d.copy_from_slice(&[r, g, b, 255]);
    }
    Ok(())
}

fn flatten_premul_px(s: &[u8], bg_rgba: [u8; 4]) -> [u8; 3] {
    let a = u16::from(s[3]);
    if a == 255 {
        return [s[0], s[1], s[2]];
    }

    let inv = 255u16 - a;
    let over = |c: u8, bg: u8| -> u8 {
        (u16::from(c) + mul_div255_u16(u16::from(bg), inv)).min(255) as u8
    };
    [
        over(s[0], bg_rgba[0]),
        over(s[1], bg_rgba[1]),
        over(s[2], bg_rgba[2]),
    ]
}

fn flatten_straight_px(s: &[u8], bg_rgba: [u8; 4]) -> [u8; 3] {
    let a = u16::from(s[3]);
    let inv = 255u16 - a;
    let over = |c: u8, bg: u8| -> u8 {
        (mul_div255_u16(u16::from(c), a) + mul_div255_u16(u16::from(bg), inv)).min(255) as u8
    };
    [
        over(s[0], bg_rgba[0]),
        over(s[1], bg_rgba[1]),
        over(s[2], bg_rgba[2]),
    ]
}
