//! Animation configuration.
//!
//! Everything that shapes a run lives in one immutable [`AnimationConfig`] value which is handed to
//! the renderer and encoder at construction. [`AnimationConfig::default`] reproduces the stock
//! PoseNet visualization: 600x600 at 15 fps, starting at frame 60, labelled 5px dots.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::encode::sink::VideoCodec;
use crate::foundation::core::{Canvas, Fps, FrameIndex, Rgba8};
use crate::foundation::error::{PosevidError, PosevidResult};

pub const BLACK: Rgba8 = Rgba8::new(0, 0, 0, 255);
pub const WHITE: Rgba8 = Rgba8::new(255, 255, 255, 255);
pub const GRAY: Rgba8 = Rgba8::new(214, 214, 214, 255);
pub const RED: Rgba8 = Rgba8::new(255, 0, 0, 255);
pub const GREEN: Rgba8 = Rgba8::new(0, 255, 0, 255);
pub const BLUE: Rgba8 = Rgba8::new(0, 0, 255, 255);
pub const ORANGE: Rgba8 = Rgba8::new(212, 175, 66, 255);
pub const YELLOW: Rgba8 = Rgba8::new(255, 255, 0, 255);
pub const TEAL: Rgba8 = Rgba8::new(33, 207, 201, 255);
pub const PURPLE: Rgba8 = Rgba8::new(207, 33, 204, 255);

/// One tracked body part.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeypointSpec {
    /// Column stem: the input carries `<name>_x` and `<name>_y`.
    pub name: String,
    /// Whether markers for this keypoint are drawn at all.
    pub included: bool,
    /// Dot fill color.
    pub color: Rgba8,
}

impl KeypointSpec {
    pub fn new(name: impl Into<String>, included: bool, color: Rgba8) -> Self {
        Self {
            name: name.into(),
            included,
            color,
        }
    }

    pub fn x_column(&self) -> String {
        format!("{}_x", self.name)
    }

    pub fn y_column(&self) -> String {
        format!("{}_y", self.name)
    }
}

/// The 17 PoseNet keypoints in draw order. Eyes and ears are tracked but hidden.
pub fn posenet_keypoints() -> Vec<KeypointSpec> {
    [
        (true, "nose", GRAY),
        (false, "leftEye", BLUE),
        (false, "rightEye", BLUE),
        (false, "leftEar", WHITE),
        (false, "rightEar", WHITE),
        (true, "leftShoulder", YELLOW),
        (true, "rightShoulder", YELLOW),
        (true, "leftElbow", BLUE),
        (true, "rightElbow", BLUE),
        (true, "leftWrist", RED),
        (true, "rightWrist", RED),
        (true, "leftHip", GREEN),
        (true, "rightHip", GREEN),
        (true, "leftKnee", ORANGE),
        (true, "rightKnee", ORANGE),
        (true, "leftAnkle", TEAL),
        (true, "rightAnkle", TEAL),
    ]
    .into_iter()
    .map(|(included, name, color)| KeypointSpec::new(name, included, color))
    .collect()
}

/// Where label glyphs come from.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSource {
    /// A font file on disk (TTF/OTF/TTC).
    Path(PathBuf),
    /// An installed system font family. `sans-serif`, `serif` and `monospace` select the
    /// platform's generic families.
    System(String),
}

impl Default for FontSource {
    fn default() -> Self {
        Self::Path(PathBuf::from("OpenSans-Regular.ttf"))
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationConfig {
    /// Output resolution; every rendered frame has exactly this size.
    pub canvas: Canvas,
    pub fps: Fps,
    /// Records with a lower frame index are dropped.
    pub start_frame: FrameIndex,
    /// Marker radius in pixels.
    pub dot_radius: f64,
    /// Draw each keypoint's name next to its dot.
    pub should_label: bool,
    pub label_size_px: f32,
    pub label_color: Rgba8,
    pub background: Rgba8,
    /// Draw order; later entries paint over earlier ones.
    pub keypoints: Vec<KeypointSpec>,
    /// Only loaded when `should_label` is set.
    pub font: FontSource,
    pub codec: VideoCodec,
    pub output: PathBuf,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas {
                width: 600,
                height: 600,
            },
            fps: Fps { num: 15, den: 1 },
            start_frame: FrameIndex(60),
            dot_radius: 5.0,
            should_label: true,
            label_size_px: 12.0,
            label_color: WHITE,
            background: BLACK,
            keypoints: posenet_keypoints(),
            font: FontSource::default(),
            codec: VideoCodec::default(),
            output: PathBuf::from("animation.mp4"),
        }
    }
}

impl AnimationConfig {
    pub fn validate(&self) -> PosevidResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(PosevidError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        if !self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2) {
            return Err(PosevidError::validation(
                "canvas width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        self.canvas.to_u16()?;
        Fps::new(self.fps.num, self.fps.den)?;

        if !self.dot_radius.is_finite() || self.dot_radius <= 0.0 {
            return Err(PosevidError::validation(
                "dot_radius must be finite and > 0",
            ));
        }
        if self.should_label && (!self.label_size_px.is_finite() || self.label_size_px <= 0.0) {
            return Err(PosevidError::validation(
                "label_size_px must be finite and > 0",
            ));
        }
        if self.background.a != 255 {
            return Err(PosevidError::validation("background must be fully opaque"));
        }

        let mut seen = BTreeSet::new();
        for kp in &self.keypoints {
            if kp.name.is_empty() {
                return Err(PosevidError::validation("keypoint names must be non-empty"));
            }
            if !seen.insert(kp.name.as_str()) {
                return Err(PosevidError::validation(format!(
                    "duplicate keypoint name '{}'",
                    kp.name
                )));
            }
        }
        Ok(())
    }
}
