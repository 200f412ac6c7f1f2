//! The cache-or-render orchestrator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::ThumbnailCache;
use crate::config::RendererConfig;
use crate::fetch::{HttpImageSource, ImageFetcher, ImageSource};
use crate::fonts::FontSet;
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::inflight::KeyedLocks;
use crate::model::Track;
use crate::render::compose::Compositor;

/// Turns a [`Track`] into a PNG path: cached, freshly rendered, or the default thumbnail.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Renderer<S = HttpImageSource> {
    config: RendererConfig,
    fetcher: ImageFetcher<S>,
    compositor: Arc<Compositor>,
    cache: ThumbnailCache,
    locks: KeyedLocks,
}

impl Renderer<HttpImageSource> {
    /// Loads fonts (falling back to the default face) and builds the pooled HTTP client.
    pub fn from_config(config: RendererConfig) -> ThumbResult<Self> {
        config.validate()?;
        let fonts = Arc::new(FontSet::load(&config.fonts));
        let source = HttpImageSource::new(config.fetch_timeout(), &config.user_agent)?;
        Self::with_source(config, fonts, source)
    }
}

impl<S: ImageSource> Renderer<S> {
    pub fn with_source(config: RendererConfig, fonts: Arc<FontSet>, source: S) -> ThumbResult<Self> {
        config.validate()?;
        let compositor = Arc::new(Compositor::new(fonts, config.layout.clone())?);
        let fetcher = ImageFetcher::new(source, config.fetch_timeout(), config.layout.canvas);
        let cache = ThumbnailCache::new(&config.cache_dir);
        Ok(Self {
            config,
            fetcher,
            compositor,
            cache,
            locks: KeyedLocks::new(),
        })
    }

    pub fn default_thumbnail(&self) -> &Path {
        &self.config.default_thumbnail
    }

    /// Render `track`, or return the default thumbnail path if anything goes wrong.
    #[tracing::instrument(skip_all, fields(track = %track.id))]
    pub async fn render(&self, track: &Track) -> PathBuf {
        match self.try_render(track).await {
            Ok(path) => path,
            Err(err) => {
                warn!(
                    error = %err,
                    fallback = %self.config.default_thumbnail.display(),
                    "render failed; serving default thumbnail"
                );
                self.config.default_thumbnail.clone()
            }
        }
    }

    /// Like [`Renderer::render`] but surfaces the failure kind.
    ///
    /// A failed fetch is not an error here: it renders over the placeholder.
    pub async fn try_render(&self, track: &Track) -> ThumbResult<PathBuf> {
        let path = self.cache.path_for(&track.id)?;
        if self.cache.exists(&path) {
            debug!(path = %path.display(), "cache hit");
            return Ok(path);
        }

        let guard = self.locks.lock(&track.id).await;
        if self.cache.exists(&path) {
            debug!(path = %path.display(), "rendered by a concurrent call");
            return Ok(path);
        }

        let source = self.fetcher.fetch(&track.thumbnail).await;

        let compositor = Arc::clone(&self.compositor);
        let cache = self.cache.clone();
        let track = track.clone();
        // The guard travels with the blocking work: a cancelled caller must not let a second
        // render of this id start while the first is still writing.
        let stored = tokio::task::spawn_blocking(move || -> ThumbResult<PathBuf> {
            let _guard = guard;
            let canvas = compositor.compose(&source, &track)?;
            cache.store(&track.id, &canvas)
        })
        .await
        .map_err(|e| ThumbError::render(format!("render task failed: {e}")))??;

        debug!(path = %stored.display(), "rendered");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontConfig;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counting(Arc<AtomicUsize>);

    impl ImageSource for Counting {
        async fn fetch(&self, _url: &str) -> ThumbResult<Vec<u8>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([90, 20, 160, 255]));
            let mut buf = Vec::new();
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(|e| ThumbError::fetch(e.to_string()))?;
            Ok(buf)
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "nowplaying_thumb_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_render_keeps_the_id_locked_until_stored() {
        let dir = temp_dir("cancelled_render");
        let config = RendererConfig {
            cache_dir: dir.join("cache"),
            default_thumbnail: dir.join("default.png"),
            ..RendererConfig::default()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let fonts = Arc::new(FontSet::builtin(&FontConfig::default()));
        let renderer =
            Arc::new(Renderer::with_source(config, fonts, Counting(Arc::clone(&calls))).unwrap());
        let track = Track::new("cancelled", "mem://art");
        let path = renderer.cache.path_for(&track.id).unwrap();

        let task = tokio::spawn({
            let renderer = Arc::clone(&renderer);
            let track = track.clone();
            async move { renderer.render(&track).await }
        });
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        // Past the fetch: decode of a 1x1 image is quick, compositing a full card is not.
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();
        let _ = task.await;

        // Either the lock is still held or the store already finished; never neither.
        let held = !renderer.locks.is_empty();
        assert!(held || path.is_file());

        assert_eq!(renderer.render(&track).await, path);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(renderer.locks.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }
}
