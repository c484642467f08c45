use std::sync::Arc;

use crate::config::FontSource;
use crate::foundation::core::Rgba8;
use crate::foundation::error::{PosevidError, PosevidResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    /// Red channel.
    pub(crate) r: u8,
    /// Green channel.
    pub(crate) g: u8,
    /// Blue channel.
    pub(crate) b: u8,
    /// Alpha channel.
    pub(crate) a: u8,
}

impl From<Rgba8> for TextBrushRgba8 {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Read label font bytes from disk or from the installed system fonts.
pub(crate) fn load_font_bytes(source: &FontSource) -> PosevidResult<Arc<Vec<u8>>> {
    match source {
        FontSource::Path(path) => {
            let bytes = std::fs::read(path).map_err(|e| {
                PosevidError::input(format!(
                    "failed to read label font '{}': {e} (pass a font file, a system font, or disable labels)",
                    path.display()
                ))
            })?;
            Ok(Arc::new(bytes))
        }
        FontSource::System(family) => load_system_font(family).map(Arc::new),
    }
}

fn load_system_font(family: &str) -> PosevidResult<Vec<u8>> {
    use usvg::fontdb;

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    if db.len() == 0 {
        return Err(PosevidError::input("no system fonts are installed"));
    }

    let wanted = match family {
        "sans-serif" => fontdb::Family::SansSerif,
        "serif" => fontdb::Family::Serif,
        "monospace" => fontdb::Family::Monospace,
        name => fontdb::Family::Name(name),
    };
    let query = fontdb::Query {
        families: &[wanted],
        ..fontdb::Query::default()
    };

    let id = match db.query(&query) {
        Some(id) => id,
        None => {
            let fallback = db
                .faces()
                .next()
                .ok_or_else(|| PosevidError::input("no system fonts are installed"))?;
            tracing::warn!(
                family,
                fallback = ?fallback.families.first().map(|(name, _)| name),
                "system font family not found, using fallback face"
            );
            fallback.id
        }
    };

    db.with_face_data(id, |data, _index| data.to_vec())
        .ok_or_else(|| PosevidError::input(format!("failed to load system font '{family}'")))
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
}

impl TextLayoutEngine {
    /// Register `font_bytes` and lay out all subsequent text with its first family.
    pub(crate) fn new(font_bytes: &[u8]) -> PosevidResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            PosevidError::input("no font families registered from label font bytes")
        })?;

        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| PosevidError::input("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    /// Shape and lay out a single unwrapped line of text.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> PosevidResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(PosevidError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brush_from_color_keeps_channels() {
        let b = TextBrushRgba8::from(Rgba8::new(1, 2, 3, 4));
        assert_eq!(
            b,
            TextBrushRgba8 {
                r: 1,
                g: 2,
                b: 3,
                a: 4
            }
        );
    }

    #[test]
    fn missing_font_file_is_an_input_error() {
        let err = load_font_bytes(&FontSource::Path("target/no-such-font.ttf".into())).unwrap_err();
        assert!(matches!(err, PosevidError::Input(_)));
        assert!(err.to_string().contains("no-such-font.ttf"));
    }

    #[test]
    fn garbage_font_bytes_register_no_family() {
        assert!(TextLayoutEngine::new(b"definitely not a font").is_err());
    }

    #[test]
    fn system_font_lays_out_label_when_available() {
        let Ok(bytes) = load_font_bytes(&FontSource::System("sans-serif".to_owned())) else {
            eprintln!("skipping: no system fonts available");
            return;
        };
        let mut engine = TextLayoutEngine::new(&bytes).unwrap();
        let layout = engine
            .layout_line("leftWrist", 12.0, TextBrushRgba8::default())
            .unwrap();
        assert!(layout.width() > 0.0);
        assert!(layout.height() > 0.0);
        assert!(engine.layout_line("x", 0.0, TextBrushRgba8::default()).is_err());
    }
}
