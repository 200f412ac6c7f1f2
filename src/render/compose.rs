use std::sync::Arc;

use image::{RgbaImage, imageops};
use tracing::warn;

use crate::fonts::FontSet;
use crate::foundation::error::ThumbResult;
use crate::model::Track;
use crate::raster::{blur, composite, fit, mask, tone};
use crate::render::layout::CardLayout;
use crate::render::overlay::OverlayPainter;
use crate::text::{self, label_or};

/// The strings a card shows for a track, after fallbacks and truncation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardLabels<'a> {
    pub title: &'a str,
    pub artist: &'a str,
    pub elapsed: &'a str,
    pub duration: &'a str,
}

/// Turns a source image plus track metadata into the final canvas.
///
/// Pure CPU work: given the same inputs (and the same fonts) the output is identical.
pub struct Compositor {
    fonts: Arc<FontSet>,
    layout: CardLayout,
}

impl Compositor {
    pub fn new(fonts: Arc<FontSet>, layout: CardLayout) -> ThumbResult<Self> {
        layout.validate()?;
        Ok(Self { fonts, layout })
    }

    pub fn layout(&self) -> &CardLayout {
        &self.layout
    }

    pub fn labels<'a>(&'a self, track: &'a Track) -> CardLabels<'a> {
        let l = &self.layout;
        CardLabels {
            title: label_or(track.title.as_deref(), &l.unknown_label, l.title_max_chars),
            artist: label_or(
                track.channel_name.as_deref(),
                &l.unknown_label,
                l.artist_max_chars,
            ),
            elapsed: &l.elapsed_label,
            duration: track
                .duration
                .as_deref()
                .filter(|d| !d.is_empty())
                .unwrap_or(&l.duration_fallback),
        }
    }

    #[tracing::instrument(skip_all, fields(track = %track.id))]
    pub fn compose(&self, source: &RgbaImage, track: &Track) -> ThumbResult<RgbaImage> {
        let canvas_size = self.layout.canvas;
        let fitted = fit::fill(source, canvas_size.width, canvas_size.height)?;

        let mut canvas = blur::gaussian_blur(&fitted, self.layout.background_blur)?;
        tone::brightness(&mut canvas, self.layout.background_brightness)?;

        self.draw_glass_panel(&mut canvas)?;
        self.draw_cover(&mut canvas, &fitted)?;
        self.draw_overlay(&mut canvas, track)?;

        if let Some(adjust) = self.layout.post_process {
            adjust.apply(&mut canvas)?;
        }
        Ok(canvas)
    }

    fn draw_glass_panel(&self, canvas: &mut RgbaImage) -> ThumbResult<()> {
        let l = &self.layout;
        let (x, y) = l.panel_origin();
        let region = imageops::crop_imm(&*canvas, x, y, l.panel_width, l.panel_height).to_image();

        let mut glass = blur::gaussian_blur(&region, l.panel_blur)?;
        composite::premultiply_in_place(&mut glass);
        composite::tint_in_place(&mut glass, l.panel_tint)?;
        composite::unpremultiply_in_place(&mut glass);
        mask::clip_rounded(&mut glass, l.panel_radius)?;

        imageops::overlay(canvas, &glass, i64::from(x), i64::from(y));
        Ok(())
    }

    fn draw_cover(&self, canvas: &mut RgbaImage, fitted: &RgbaImage) -> ThumbResult<()> {
        let l = &self.layout;
        let mut cover = fit::fill(fitted, l.cover_size, l.cover_size)?;
        mask::clip_rounded(&mut cover, l.cover_radius)?;

        let origin = l.cover_rect().origin();
        imageops::overlay(canvas, &cover, origin.x as i64, origin.y as i64);
        Ok(())
    }

    fn draw_overlay(&self, canvas: &mut RgbaImage, track: &Track) -> ThumbResult<()> {
        let l = &self.layout;
        let mut painter = OverlayPainter::new(canvas.width(), canvas.height())?;

        painter.fill_rect(l.bar_track(), l.bar_color);
        painter.fill_rect(l.bar_fill(), l.bar_fill_color);

        if l.controls {
            for icon in l.control_icons(f64::from(self.fonts.title.size_px)) {
                painter.fill_path(&icon, l.controls_color);
            }
        }

        let labels = self.labels(track);
        let lines = [
            (labels.title, &self.fonts.title, l.title_color, l.at(l.title_offset)),
            (labels.artist, &self.fonts.artist, l.artist_color, l.at(l.artist_offset)),
            (
                labels.elapsed,
                &self.fonts.small,
                l.time_label_color,
                l.elapsed_label_origin(),
            ),
            (
                labels.duration,
                &self.fonts.small,
                l.time_label_color,
                l.duration_label_origin(),
            ),
        ];

        text::with_engine(|engine| {
            for (label, face, color, origin) in lines {
                if label.is_empty() {
                    continue;
                }
                match engine.layout_line(label, face, color) {
                    Ok(layout) => painter.draw_text(&layout, origin),
                    Err(err) => {
                        // The same face failure would repeat for every remaining label.
                        warn!(error = %err, "text layout failed; card drawn without text");
                        break;
                    }
                }
            }
        });

        let overlay = painter.finish();
        composite::premultiply_in_place(canvas);
        composite::over_in_place(canvas, &overlay, 1.0)?;
        composite::unpremultiply_in_place(canvas);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontConfig;

    fn compositor() -> Compositor {
        let fonts = Arc::new(FontSet::builtin(&FontConfig::default()));
        Compositor::new(fonts, CardLayout::default()).unwrap()
    }

    #[test]
    fn labels_apply_caps_and_fallbacks() {
        let c = compositor();
        let long = Track::new("id", "url")
            .with_title("x".repeat(50))
            .with_channel_name("y".repeat(50));
        let labels = c.labels(&long);
        assert_eq!(labels.title, "x".repeat(32));
        assert_eq!(labels.artist, "y".repeat(30));
        assert_eq!(labels.elapsed, "0:24");
        assert_eq!(labels.duration, "--:--");

        let bare = Track::new("id", "url").with_title("").with_duration("3:45");
        let labels = c.labels(&bare);
        assert_eq!(labels.title, "Unknown");
        assert_eq!(labels.artist, "Unknown");
        assert_eq!(labels.duration, "3:45");
    }

    #[test]
    fn invalid_layout_is_rejected() {
        let fonts = Arc::new(FontSet::builtin(&FontConfig::default()));
        let layout = CardLayout {
            panel_height: 10_000,
            ..CardLayout::default()
        };
        assert!(Compositor::new(fonts, layout).is_err());
    }
}
