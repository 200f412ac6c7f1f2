use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::raster::tone::ToneAdjust;

/// Geometry, colors and copy of the "now playing" card.
///
/// Offsets for the cover, text, progress bar and controls are relative to the panel's
/// top-left corner. The panel is centered on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardLayout {
    pub canvas: Canvas,

    pub background_blur: f32,
    pub background_brightness: f32,

    pub panel_width: u32,
    pub panel_height: u32,
    pub panel_radius: f64,
    pub panel_blur: f32,
    pub panel_tint: Rgba8,

    pub cover_size: u32,
    pub cover_radius: f64,
    pub cover_offset: Vec2,

    pub title_offset: Vec2,
    pub title_max_chars: usize,
    pub title_color: Rgba8,
    pub artist_offset: Vec2,
    pub artist_max_chars: usize,
    pub artist_color: Rgba8,
    pub unknown_label: String,

    pub bar_start_x: f64,
    pub bar_end_x: f64,
    pub bar_y: f64,
    pub bar_thickness: f64,
    pub bar_color: Rgba8,
    pub bar_fill_color: Rgba8,
    /// Share of the bar drawn as elapsed. Cosmetic: not tied to playback.
    pub progress_fraction: f64,
    pub time_label_rise: f64,
    pub time_label_color: Rgba8,
    pub elapsed_label: String,
    pub duration_fallback: String,
    pub duration_label_inset: f64,

    pub controls: bool,
    pub controls_offset: Vec2,
    pub controls_color: Rgba8,

    pub post_process: Option<ToneAdjust>,
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            canvas: Canvas::THUMBNAIL,

            background_blur: 40.0,
            background_brightness: 0.6,

            panel_width: 900,
            panel_height: 460,
            panel_radius: 40.0,
            panel_blur: 20.0,
            panel_tint: Rgba8::new(25, 25, 45, 170),

            cover_size: 220,
            cover_radius: 25.0,
            cover_offset: Vec2::new(70.0, 110.0),

            title_offset: Vec2::new(340.0, 120.0),
            title_max_chars: 32,
            title_color: Rgba8::WHITE,
            artist_offset: Vec2::new(340.0, 170.0),
            artist_max_chars: 30,
            artist_color: Rgba8::opaque(200, 200, 200),
            unknown_label: "Unknown".to_string(),

            bar_start_x: 340.0,
            bar_end_x: 780.0,
            bar_y: 240.0,
            bar_thickness: 6.0,
            bar_color: Rgba8::opaque(140, 140, 140),
            bar_fill_color: Rgba8::WHITE,
            progress_fraction: 180.0 / 440.0,
            time_label_rise: 30.0,
            time_label_color: Rgba8::WHITE,
            elapsed_label: "0:24".to_string(),
            duration_fallback: "--:--".to_string(),
            duration_label_inset: 40.0,

            controls: true,
            controls_offset: Vec2::new(420.0, 300.0),
            controls_color: Rgba8::WHITE,

            post_process: None,
        }
    }
}

impl CardLayout {
    pub fn validate(&self) -> ThumbResult<()> {
        self.canvas.validate()?;
        if self.panel_width == 0
            || self.panel_height == 0
            || self.panel_width > self.canvas.width
            || self.panel_height > self.canvas.height
        {
            return Err(ThumbError::config("panel must be non-empty and fit the canvas"));
        }
        let panel = Rect::new(0.0, 0.0, f64::from(self.panel_width), f64::from(self.panel_height));
        let cover = self.cover_rect_in_panel();
        if self.cover_size == 0 || panel.intersect(cover) != cover {
            return Err(ThumbError::config("cover must be non-empty and inside the panel"));
        }
        if !(0.0..=1.0).contains(&self.progress_fraction) {
            return Err(ThumbError::config("progress_fraction must be within [0, 1]"));
        }
        if self.bar_end_x < self.bar_start_x || self.bar_thickness <= 0.0 {
            return Err(ThumbError::config("progress bar must have positive extent"));
        }
        for (name, v) in [
            ("background_blur", self.background_blur),
            ("panel_blur", self.panel_blur),
            ("background_brightness", self.background_brightness),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ThumbError::config(format!("{name} must be finite and >= 0")));
            }
        }
        Ok(())
    }

    /// Top-left corner of the centered panel, in canvas pixels.
    pub fn panel_origin(&self) -> (u32, u32) {
        (
            self.canvas.width.saturating_sub(self.panel_width) / 2,
            self.canvas.height.saturating_sub(self.panel_height) / 2,
        )
    }

    pub fn panel_rect(&self) -> Rect {
        let (x, y) = self.panel_origin();
        Rect::from_origin_size(
            (f64::from(x), f64::from(y)),
            (f64::from(self.panel_width), f64::from(self.panel_height)),
        )
    }

    fn cover_rect_in_panel(&self) -> Rect {
        let size = f64::from(self.cover_size);
        Rect::from_origin_size(self.cover_offset.to_point(), (size, size))
    }

    pub fn cover_rect(&self) -> Rect {
        self.cover_rect_in_panel() + self.panel_rect().origin().to_vec2()
    }

    /// Canvas position of a panel-relative offset.
    pub fn at(&self, offset: Vec2) -> Point {
        self.panel_rect().origin() + offset
    }

    /// Full-length track of the progress bar, centered on `bar_y`.
    pub fn bar_track(&self) -> Rect {
        let half = self.bar_thickness / 2.0;
        let origin = self.panel_rect().origin();
        Rect::new(
            origin.x + self.bar_start_x,
            origin.y + self.bar_y - half,
            origin.x + self.bar_end_x,
            origin.y + self.bar_y + half,
        )
    }

    pub fn bar_fill(&self) -> Rect {
        let track = self.bar_track();
        Rect::new(
            track.x0,
            track.y0,
            track.x0 + track.width() * self.progress_fraction,
            track.y1,
        )
    }

    pub fn elapsed_label_origin(&self) -> Point {
        let track = self.bar_track();
        Point::new(track.x0, track.center().y - self.time_label_rise)
    }

    pub fn duration_label_origin(&self) -> Point {
        let track = self.bar_track();
        Point::new(
            track.x1 - self.duration_label_inset,
            track.center().y - self.time_label_rise,
        )
    }

    /// Previous / play-pause / next icons, each `size` pixels tall.
    pub fn control_icons(&self, size: f64) -> Vec<BezPath> {
        let origin = self.at(self.controls_offset);
        let gap = size * 1.6;
        let mut icons = Vec::with_capacity(3);

        let prev_x = origin.x;
        let mut prev = BezPath::new();
        push_rect(&mut prev, Rect::new(prev_x, origin.y, prev_x + size * 0.12, origin.y + size));
        push_triangle(&mut prev, prev_x + size * 0.12, origin.y, size * 0.44, size, false);
        push_triangle(&mut prev, prev_x + size * 0.56, origin.y, size * 0.44, size, false);
        icons.push(prev);

        let play_x = prev_x + size + gap;
        let mut play = BezPath::new();
        push_triangle(&mut play, play_x, origin.y, size * 0.55, size, true);
        push_rect(
            &mut play,
            Rect::new(play_x + size * 0.65, origin.y, play_x + size * 0.78, origin.y + size),
        );
        push_rect(
            &mut play,
            Rect::new(play_x + size * 0.87, origin.y, play_x + size, origin.y + size),
        );
        icons.push(play);

        let next_x = play_x + size + gap;
        let mut next = BezPath::new();
        push_triangle(&mut next, next_x, origin.y, size * 0.44, size, true);
        push_triangle(&mut next, next_x + size * 0.44, origin.y, size * 0.44, size, true);
        push_rect(
            &mut next,
            Rect::new(next_x + size * 0.88, origin.y, next_x + size, origin.y + size),
        );
        icons.push(next);

        icons
    }
}

fn push_rect(path: &mut BezPath, r: Rect) {
    path.move_to((r.x0, r.y0));
    path.line_to((r.x1, r.y0));
    path.line_to((r.x1, r.y1));
    path.line_to((r.x0, r.y1));
    path.close_path();
}

/// Isosceles triangle in the box `(x, y, w, h)` pointing right or left.
fn push_triangle(path: &mut BezPath, x: f64, y: f64, w: f64, h: f64, right: bool) {
    if right {
        path.move_to((x, y));
        path.line_to((x + w, y + h / 2.0));
        path.line_to((x, y + h));
    } else {
        path.move_to((x + w, y));
        path.line_to((x, y + h / 2.0));
        path.line_to((x + w, y + h));
    }
    path.close_path();
}
