//! Remote album-art acquisition.
//!
//! [`ImageSource`] is the transport seam (HTTP in production, stubs in tests) and only moves
//! bytes. [`ImageFetcher`] adds the timeout, decodes and fits on the blocking pool, and falls
//! back to the placeholder: it always yields a canvas-sized image.

use std::future::Future;
use std::time::Duration;

use image::RgbaImage;
use tracing::{debug, warn};

use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{ThumbError, ThumbResult};
use crate::raster::fit;

/// Opaque dark gray used whenever the source image is unavailable.
pub const PLACEHOLDER_COLOR: Rgba8 = Rgba8::opaque(30, 30, 30);

/// Something that can turn a URL into encoded image bytes.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = ThumbResult<Vec<u8>>> + Send;
}

/// HTTP source backed by one pooled `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new(timeout: Duration, user_agent: &str) -> ThumbResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ThumbError::config(format!("build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> ThumbResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ThumbError::fetch(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ThumbError::fetch(format!("GET {url}: status {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ThumbError::fetch(format!("GET {url}: read body: {e}")))?;
        debug!(url, len = bytes.len(), "fetched thumbnail bytes");
        Ok(bytes.to_vec())
    }
}

/// Canvas-sized opaque placeholder.
pub fn placeholder(canvas: Canvas) -> RgbaImage {
    RgbaImage::from_pixel(canvas.width, canvas.height, PLACEHOLDER_COLOR.to_image())
}

/// Timeout + fit + placeholder policy around an [`ImageSource`].
#[derive(Clone, Debug)]
pub struct ImageFetcher<S> {
    source: S,
    timeout: Duration,
    canvas: Canvas,
}

impl<S: ImageSource> ImageFetcher<S> {
    pub fn new(source: S, timeout: Duration, canvas: Canvas) -> Self {
        Self {
            source,
            timeout,
            canvas,
        }
    }

    /// Fetch `url` and fit it to the canvas; on any failure, the placeholder.
    pub async fn fetch(&self, url: &str) -> RgbaImage {
        match self.try_fetch(url).await {
            Ok(img) => img,
            Err(err) => {
                warn!(url, error = %err, "thumbnail fetch failed; using placeholder");
                placeholder(self.canvas)
            }
        }
    }

    /// The timeout covers download, decode and fit. Decode and fit run on the blocking pool;
    /// on expiry that task is abandoned rather than awaited.
    pub async fn try_fetch(&self, url: &str) -> ThumbResult<RgbaImage> {
        tokio::time::timeout(self.timeout, self.download_and_fit(url))
            .await
            .map_err(|_| {
                ThumbError::fetch(format!("GET {url}: timed out after {:?}", self.timeout))
            })?
    }

    async fn download_and_fit(&self, url: &str) -> ThumbResult<RgbaImage> {
        let bytes = self.source.fetch(url).await?;
        let canvas = self.canvas;
        let owned_url = url.to_owned();
        tokio::task::spawn_blocking(move || decode_and_fit(&bytes, canvas, &owned_url))
            .await
            .map_err(|e| ThumbError::fetch(format!("decode task for {url}: {e}")))?
    }
}

fn decode_and_fit(bytes: &[u8], canvas: Canvas, url: &str) -> ThumbResult<RgbaImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ThumbError::fetch(format!("decode {url}: {e}")))?;
    fit::fill(&img.to_rgba8(), canvas.width, canvas.height)
        .map_err(|e| ThumbError::fetch(format!("fit {url}: {e}")))
}
