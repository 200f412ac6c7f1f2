//! Font loading for the three text roles of the card.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use parley::fontique::Blob;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::foundation::error::{ThumbError, ThumbResult};
use crate::text::TextLayoutEngine;

/// Where a text role's face comes from and at what size it is drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub path: PathBuf,
    pub size_px: f32,
}

impl FontSpec {
    pub fn new(path: impl Into<PathBuf>, size_px: f32) -> Self {
        Self {
            path: path.into(),
            size_px,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub title: FontSpec,
    pub artist: FontSpec,
    pub small: FontSpec,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            title: FontSpec::new("assets/fonts/Raleway-Bold.ttf", 36.0),
            artist: FontSpec::new("assets/fonts/Inter-Light.ttf", 26.0),
            small: FontSpec::new("assets/fonts/Inter-Light.ttf", 22.0),
        }
    }
}

impl FontConfig {
    pub fn validate(&self) -> ThumbResult<()> {
        for (role, spec) in self.roles() {
            if !spec.size_px.is_finite() || spec.size_px <= 0.0 {
                return Err(ThumbError::config(format!(
                    "{role} font size must be finite and > 0"
                )));
            }
        }
        Ok(())
    }

    fn roles(&self) -> [(&'static str, &FontSpec); 3] {
        [
            ("title", &self.title),
            ("artist", &self.artist),
            ("small", &self.small),
        ]
    }
}

#[derive(Clone, Debug)]
pub enum FaceSource {
    /// Font file read at startup.
    Bundled { path: PathBuf, bytes: Blob<u8> },
    /// The platform's generic sans-serif face.
    Default,
}

#[derive(Clone, Debug)]
pub struct FontFace {
    pub source: FaceSource,
    pub size_px: f32,
}

impl FontFace {
    pub fn is_default(&self) -> bool {
        matches!(self.source, FaceSource::Default)
    }
}

/// The immutable set of faces every render reads.
///
/// Build it once at startup and share it behind an `Arc`.
#[derive(Clone, Debug)]
pub struct FontSet {
    pub title: FontFace,
    pub artist: FontFace,
    pub small: FontFace,
}

impl FontSet {
    /// Load all three roles, or fall back to the default face for all of them.
    ///
    /// Never fails: a missing or corrupt font file is logged and replaced.
    pub fn load(config: &FontConfig) -> Self {
        match Self::try_load(config) {
            Ok(fonts) => fonts,
            Err(err) => {
                warn!(error = %err, "font load failed; using the default face");
                Self::builtin(config)
            }
        }
    }

    pub fn try_load(config: &FontConfig) -> ThumbResult<Self> {
        config.validate()?;
        let mut engine = TextLayoutEngine::new();
        let mut load = |spec: &FontSpec| -> ThumbResult<FontFace> {
            let bytes = Blob::from(read_font(&spec.path)?);
            let family = engine.register(&bytes).map_err(|err| {
                ThumbError::font(format!("{}: {err}", spec.path.display()))
            })?;
            debug!(path = %spec.path.display(), family = %family, "loaded font");
            Ok(FontFace {
                source: FaceSource::Bundled {
                    path: spec.path.clone(),
                    bytes,
                },
                size_px: spec.size_px,
            })
        };

        Ok(Self {
            title: load(&config.title)?,
            artist: load(&config.artist)?,
            small: load(&config.small)?,
        })
    }

    /// Default faces at the configured sizes.
    pub fn builtin(config: &FontConfig) -> Self {
        let face = |spec: &FontSpec| FontFace {
            source: FaceSource::Default,
            size_px: spec.size_px,
        };
        Self {
            title: face(&config.title),
            artist: face(&config.artist),
            small: face(&config.small),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.title.is_default() && self.artist.is_default() && self.small.is_default()
    }
}

fn read_font(path: &Path) -> ThumbResult<Vec<u8>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read font '{}'", path.display()))
        .map_err(|err| ThumbError::font(format!("{err:#}")))?;
    if bytes.is_empty() {
        return Err(ThumbError::font(format!(
            "font file '{}' is empty",
            path.display()
        )));
    }
    Ok(bytes)
}
