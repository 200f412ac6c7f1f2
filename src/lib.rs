//! Cached "now playing" thumbnail renderer.
//!
//! A [`Renderer`] turns a [`Track`] into a 1280x720 PNG: blurred album art behind a frosted
//! glass panel holding a rounded cover, title and artist text, a progress bar and playback
//! controls. Renders are cached on disk as `{cache_dir}/{id}.png` and never redone.
//! [`Renderer::render`] never fails; it falls back to the configured default thumbnail.

#![forbid(unsafe_code)]

mod cache;
mod config;
mod fetch;
mod fonts;
mod foundation;
mod inflight;
mod model;
mod raster;
mod render;
mod renderer;
mod text;

pub use cache::{ThumbnailCache, validate_track_id};
pub use config::{DEFAULT_FETCH_TIMEOUT_MS, RendererConfig};
pub use fetch::{HttpImageSource, ImageFetcher, ImageSource, PLACEHOLDER_COLOR, placeholder};
pub use fonts::{FaceSource, FontConfig, FontFace, FontSet, FontSpec};
pub use foundation::core::{Canvas, Point, Rect, Rgba8};
pub use foundation::error::{ThumbError, ThumbResult};
pub use inflight::{KeyGuard, KeyedLocks};
pub use model::Track;
pub use raster::mask::rounded_rect_mask;
pub use raster::tone::ToneAdjust;
pub use render::compose::{CardLabels, Compositor};
pub use render::layout::CardLayout;
pub use renderer::Renderer;
pub use text::truncate_chars;
