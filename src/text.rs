use std::borrow::Cow;
use std::cell::RefCell;

use parley::fontique::Blob;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::fonts::{FaceSource, FontFace};

/// Generic family used when a role has no bundled face.
const DEFAULT_FAMILY: &str = "sans-serif";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
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

/// First `max_chars` characters of `text`, cut on a char boundary.
///
/// A hard cap: no ellipsis and no word-boundary handling.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// `value` truncated to `max_chars`, or `fallback` when it is missing or empty.
pub fn label_or<'a>(value: Option<&'a str>, fallback: &'a str, max_chars: usize) -> &'a str {
    let text = value.filter(|v| !v.is_empty()).unwrap_or(fallback);
    truncate_chars(text, max_chars)
}

/// Stateful helper for building single-line Parley layouts.
///
/// Bundled faces are registered lazily, once per engine, keyed by blob id.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    registered: Vec<(u64, String)>,
}

thread_local! {
    static ENGINE: RefCell<TextLayoutEngine> = RefCell::new(TextLayoutEngine::new());
}

/// Run `f` with this thread's layout engine. System fonts are scanned once per thread.
pub(crate) fn with_engine<R>(f: impl FnOnce(&mut TextLayoutEngine) -> R) -> R {
    ENGINE.with_borrow_mut(f)
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            registered: Vec::new(),
        }
    }

    /// Register font bytes and return the family name they provide.
    pub(crate) fn register(&mut self, font_bytes: &Blob<u8>) -> ThumbResult<String> {
        if let Some((_, family)) = self
            .registered
            .iter()
            .find(|(id, _)| *id == font_bytes.id())
        {
            return Ok(family.clone());
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(font_bytes.clone(), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| ThumbError::font("no font families registered from font bytes"))?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ThumbError::font("registered font family has no name"))?
            .to_string();

        self.registered.push((font_bytes.id(), family_name.clone()));
        Ok(family_name)
    }

    fn family_for(&mut self, face: &FontFace) -> ThumbResult<String> {
        match &face.source {
            FaceSource::Bundled { bytes, .. } => self.register(bytes),
            FaceSource::Default => {
                if self.font_ctx.collection.family_names().next().is_none() {
                    return Err(ThumbError::font("no system fonts for the default face"));
                }
                Ok(DEFAULT_FAMILY.to_string())
            }
        }
    }

    /// Shape `text` as a single unwrapped line in `face`.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        face: &FontFace,
        color: Rgba8,
    ) -> ThumbResult<parley::Layout<TextBrushRgba8>> {
        if !face.size_px.is_finite() || face.size_px <= 0.0 {
            return Err(ThumbError::font("font size must be finite and > 0"));
        }
        let family_name = self.family_for(face)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(face.size_px));
        builder.push_default(parley::style::StyleProperty::Brush(TextBrushRgba8::from(
            color,
        )));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}
