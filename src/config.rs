//! Renderer configuration, loadable from JSON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::fonts::FontConfig;
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::render::layout::CardLayout;

pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 6_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Directory holding `{id}.png` renders. Created on first write.
    pub cache_dir: PathBuf,
    /// Returned by [`crate::Renderer::render`] whenever a render fails.
    pub default_thumbnail: PathBuf,
    pub fetch_timeout_ms: u64,
    pub user_agent: String,
    pub fonts: FontConfig,
    pub layout: CardLayout,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            default_thumbnail: PathBuf::from("assets/default_thumbnail.png"),
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            fonts: FontConfig::default(),
            layout: CardLayout::default(),
        }
    }
}

impl RendererConfig {
    pub fn from_json_str(json: &str) -> ThumbResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| ThumbError::config(format!("parse renderer config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> ThumbResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read renderer config '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> ThumbResult<()> {
        if self.fetch_timeout_ms == 0 {
            return Err(ThumbError::config("fetch_timeout_ms must be > 0"));
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ThumbError::config("cache_dir must not be empty"));
        }
        if self.default_thumbnail.as_os_str().is_empty() {
            return Err(ThumbError::config("default_thumbnail must not be empty"));
        }
        self.fonts.validate()?;
        self.layout.validate()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}
