use crate::foundation::error::{ThumbError, ThumbResult};

pub use kurbo::{Point, Rect};

/// Output raster dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// The only output size the renderer produces.
    pub const THUMBNAIL: Canvas = Canvas {
        width: 1280,
        height: 720,
    };

    pub fn validate(self) -> ThumbResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ThumbError::config("canvas dimensions must be > 0"));
        }
        // vello_cpu pixmaps are addressed with u16.
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(ThumbError::config("canvas dimensions must fit in u16"));
        }
        Ok(())
    }

    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::THUMBNAIL
    }
}

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Rgba8 = Rgba8::opaque(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_image(self) -> image::Rgba<u8> {
        image::Rgba(self.to_array())
    }
}
