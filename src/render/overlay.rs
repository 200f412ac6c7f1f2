use crate::foundation::core::Rgba8;
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::text::TextBrushRgba8;

/// Vector layer for the crisp card elements: progress bar, control icons and text.
///
/// Everything is drawn onto a transparent pixmap which is then composited over the raster
/// background in one pass.
pub(crate) struct OverlayPainter {
    ctx: vello_cpu::RenderContext,
    width: u16,
    height: u16,
}

impl OverlayPainter {
    pub(crate) fn new(width: u32, height: u32) -> ThumbResult<Self> {
        let width: u16 = width
            .try_into()
            .map_err(|_| ThumbError::render("overlay width exceeds u16"))?;
        let height: u16 = height
            .try_into()
            .map_err(|_| ThumbError::render("overlay height exceeds u16"))?;
        Ok(Self {
            ctx: vello_cpu::RenderContext::new(width, height),
            width,
            height,
        })
    }

    pub(crate) fn fill_rect(&mut self, rect: kurbo::Rect, color: Rgba8) {
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(color_to_cpu(color));
        self.ctx.fill_rect(&rect_to_cpu(rect));
    }

    pub(crate) fn fill_path(&mut self, path: &kurbo::BezPath, color: Rgba8) {
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(color_to_cpu(color));
        self.ctx.fill_path(&bezpath_to_cpu(path));
    }

    /// Draw a laid-out line with its top-left corner at `origin`.
    pub(crate) fn draw_text(
        &mut self,
        layout: &parley::Layout<TextBrushRgba8>,
        origin: kurbo::Point,
    ) {
        self.ctx
            .set_transform(vello_cpu::kurbo::Affine::translate((origin.x, origin.y)));

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                self.ctx
                    .glyph_run(run.run().font())
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }

        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    }

    /// Rasterize everything drawn so far as premultiplied RGBA8.
    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.render_to_pixmap(&mut pixmap);
        pixmap.data_as_u8_slice().to_vec()
    }
}

fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn rect_to_cpu(r: kurbo::Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(buf: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * width + x) * 4) as usize;
        [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
    }

    #[test]
    fn untouched_overlay_is_transparent() {
        let out = OverlayPainter::new(8, 8).unwrap().finish();
        assert_eq!(out.len(), 8 * 8 * 4);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn filled_rect_covers_only_its_pixels() {
        let mut painter = OverlayPainter::new(16, 16).unwrap();
        painter.fill_rect(kurbo::Rect::new(4.0, 4.0, 12.0, 10.0), Rgba8::WHITE);
        let out = painter.finish();
        assert_eq!(px(&out, 16, 8, 6), [255, 255, 255, 255]);
        assert_eq!(px(&out, 16, 1, 1), [0, 0, 0, 0]);
        assert_eq!(px(&out, 16, 8, 12), [0, 0, 0, 0]);
    }

    #[test]
    fn filled_path_uses_its_color() {
        let mut painter = OverlayPainter::new(10, 10).unwrap();
        let mut path = kurbo::BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        path.line_to((10.0, 10.0));
        path.line_to((0.0, 10.0));
        path.close_path();
        painter.fill_path(&path, Rgba8::opaque(140, 140, 140));
        let out = painter.finish();
        let p = px(&out, 10, 5, 5);
        assert_eq!(p[3], 255);
        for c in &p[..3] {
            assert!((i32::from(*c) - 140).abs() <= 1, "{p:?}");
        }
    }

    #[test]
    fn oversized_overlay_is_rejected() {
        assert!(OverlayPainter::new(70_000, 1).is_err());
    }
}
