use kurbo::Shape as _;

use crate::config::AnimationConfig;
use crate::foundation::core::{Point, Rgba8};
use crate::foundation::error::{PosevidError, PosevidResult};
use crate::records::FrameRecord;
use crate::render::frame::{FrameRGBA, RenderedFrame};
use crate::render::text::{TextBrushRgba8, TextLayoutEngine, load_font_bytes};

/// Per-keypoint drawing state, resolved once from the configuration.
struct MarkerStyle {
    included: bool,
    color: Rgba8,
    label: Option<parley::Layout<TextBrushRgba8>>,
}

/// CPU rasterizer for keypoint markers.
///
/// Built once per run from an [`AnimationConfig`]. Label layouts are shaped up front (keypoint
/// names never change), so per-frame work is a background fill plus one circle and at most one
/// glyph run per detected keypoint.
pub struct MarkerRenderer {
    width: u16,
    height: u16,
    background: Rgba8,
    dot_radius: f64,
    markers: Vec<MarkerStyle>,
    label_font: Option<vello_cpu::peniko::FontData>,
    ctx: Option<vello_cpu::RenderContext>,
}

impl MarkerRenderer {
    /// Validate `cfg` and prepare markers. Loads the label font when labels are enabled.
    pub fn new(cfg: &AnimationConfig) -> PosevidResult<Self> {
        cfg.validate()?;
        let (width, height) = cfg.canvas.to_u16()?;

        let mut label_font = None;
        let mut engine = None;
        if cfg.should_label {
            let bytes = load_font_bytes(&cfg.font)?;
            engine = Some(TextLayoutEngine::new(&bytes)?);
            label_font = Some(vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
                0,
            ));
        }

        let mut markers = Vec::with_capacity(cfg.keypoints.len());
        for kp in &cfg.keypoints {
            let label = match engine.as_mut() {
                Some(engine) if kp.included => Some(engine.layout_line(
                    &kp.name,
                    cfg.label_size_px,
                    cfg.label_color.into(),
                )?),
                _ => None,
            };
            markers.push(MarkerStyle {
                included: kp.included,
                color: kp.color,
                label,
            });
        }

        Ok(Self {
            width,
            height,
            background: cfg.background,
            dot_radius: cfg.dot_radius,
            markers,
            label_font,
            ctx: None,
        })
    }

    /// Render one record onto a fresh background-filled frame.
    ///
    /// Keypoints are drawn in configuration order. A keypoint without a usable coordinate is
    /// skipped; nothing else about the frame changes.
    pub fn render(&mut self, record: &FrameRecord) -> PosevidResult<RenderedFrame> {
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == self.width && ctx.height() == self.height => ctx,
            _ => vello_cpu::RenderContext::new(self.width, self.height),
        };
        ctx.reset();

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(cpu_color(self.background));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));

        let mut drawn = 0usize;
        for (i, style) in self.markers.iter().enumerate() {
            if !style.included {
                continue;
            }
            let Some(center) = record.point(i) else {
                continue;
            };

            self.draw_dot(&mut ctx, center, style.color);
            if let (Some(layout), Some(font)) = (style.label.as_ref(), self.label_font.as_ref()) {
                let origin = Point::new(center.x + self.dot_radius, center.y + self.dot_radius);
                self.draw_label(&mut ctx, origin, layout, font);
            }
            drawn += 1;
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        ctx.render_to_pixmap(&mut pixmap);
        self.ctx = Some(ctx);

        let data = pixmap.data_as_u8_slice().to_vec();
        if data.len() != usize::from(self.width) * usize::from(self.height) * 4 {
            return Err(PosevidError::validation(
                "rasterizer returned an unexpected pixel buffer size",
            ));
        }

        Ok(RenderedFrame {
            index: record.frame,
            pixels: FrameRGBA {
                width: u32::from(self.width),
                height: u32::from(self.height),
                data,
                premultiplied: true,
            },
            markers: drawn,
        })
    }

    fn visible(&self, rect: kurbo::Rect) -> bool {
        rect.x1 >= 0.0
            && rect.y1 >= 0.0
            && rect.x0 <= f64::from(self.width)
            && rect.y0 <= f64::from(self.height)
    }

    fn draw_dot(&self, ctx: &mut vello_cpu::RenderContext, center: Point, color: Rgba8) {
        let circle = kurbo::Circle::new(center, self.dot_radius);
        if !self.visible(circle.bounding_box()) {
            return;
        }

        let mut path = vello_cpu::kurbo::BezPath::new();
        for el in circle.path_elements(0.1) {
            path.push(el);
        }
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(cpu_color(color));
        ctx.fill_path(&path);
    }

    fn draw_label(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        origin: Point,
        layout: &parley::Layout<TextBrushRgba8>,
        font: &vello_cpu::peniko::FontData,
    ) {
        let extent = kurbo::Rect::new(
            origin.x,
            origin.y,
            origin.x + f64::from(layout.width()),
            origin.y + f64::from(layout.height()),
        );
        if !self.visible(extent) {
            return;
        }

        ctx.set_transform(vello_cpu::kurbo::Affine::translate((origin.x, origin.y)));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                // Absolute layout positions: per-glyph advance plus the line baseline.
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }
}

fn cpu_color(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}
