use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use std::io::Cursor;

use image::RgbaImage;
use nowplaying_thumb::{
    FontConfig, FontSet, ImageSource, Renderer, RendererConfig, ThumbError, ThumbResult, Track,
};

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

fn config_in(dir: &Path) -> RendererConfig {
    RendererConfig {
        cache_dir: dir.join("cache"),
        default_thumbnail: dir.join("default.png"),
        ..RendererConfig::default()
    }
}

fn fonts() -> Arc<FontSet> {
    Arc::new(FontSet::builtin(&FontConfig::default()))
}

fn solid_png(r: u8, g: u8, b: u8) -> Vec<u8> {
    let img = RgbaImage::from_pixel(64, 64, image::Rgba([r, g, b, 255]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn track(id: &str) -> Track {
    Track::new(id, "http://example.invalid/art.jpg")
        .with_title("Never Gonna Give You Up")
        .with_channel_name("Rick Astley")
        .with_duration("3:33")
}

/// Fails the test if the pipeline ever reaches the network.
struct NoFetch;

impl ImageSource for NoFetch {
    async fn fetch(&self, url: &str) -> ThumbResult<Vec<u8>> {
        panic!("unexpected fetch of {url}");
    }
}

#[derive(Clone)]
struct Counting {
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl Counting {
    fn new(delay: Duration) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageSource for Counting {
    async fn fetch(&self, _url: &str) -> ThumbResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(solid_png(200, 40, 40))
    }
}

struct Unreachable;

impl ImageSource for Unreachable {
    async fn fetch(&self, url: &str) -> ThumbResult<Vec<u8>> {
        Err(ThumbError::fetch(format!("GET {url}: connection refused")))
    }
}

#[tokio::test]
async fn renders_then_serves_from_cache() {
    let dir = temp_dir("end_to_end");
    let source = Counting::new(Duration::ZERO);
    let renderer = Renderer::with_source(config_in(&dir), fonts(), source.clone()).unwrap();

    let first = renderer.render(&track("abc123")).await;
    assert_eq!(first, dir.join("cache").join("abc123.png"));
    let img = image::open(&first).unwrap();
    assert_eq!((img.width(), img.height()), (1280, 720));
    assert_eq!(source.calls(), 1);

    let second = renderer.render(&track("abc123")).await;
    assert_eq!(second, first);
    assert_eq!(source.calls(), 1);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn cache_hit_never_fetches() {
    let dir = temp_dir("cache_hit");
    let cfg = config_in(&dir);
    std::fs::create_dir_all(&cfg.cache_dir).unwrap();
    let cached = cfg.cache_dir.join("seen.png");
    RgbaImage::new(2, 2).save(&cached).unwrap();

    let renderer = Renderer::with_source(cfg, fonts(), NoFetch).unwrap();
    assert_eq!(renderer.try_render(&track("seen")).await.unwrap(), cached);
    assert_eq!(renderer.render(&track("seen")).await, cached);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn fetch_failure_renders_over_placeholder() {
    let dir = temp_dir("fetch_failure");
    let renderer = Renderer::with_source(config_in(&dir), fonts(), Unreachable).unwrap();

    let path = renderer.try_render(&track("offline")).await.unwrap();
    assert_eq!(path, dir.join("cache").join("offline.png"));

    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (1280, 720));
    // Outside the panel: the placeholder gray, blurred and darkened to 60%.
    assert_eq!(img.get_pixel(20, 20).0, [18, 18, 18, 255]);
    assert_eq!(img.get_pixel(1260, 700).0, [18, 18, 18, 255]);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn persist_failure_returns_default_path() {
    let dir = temp_dir("persist_failure");
    std::fs::create_dir_all(&dir).unwrap();
    let mut cfg = config_in(&dir);
    // A regular file where the cache directory should be.
    std::fs::write(&cfg.cache_dir, b"not a directory").unwrap();
    cfg.default_thumbnail = PathBuf::from("assets/default_thumbnail.png");

    let renderer = Renderer::with_source(cfg, fonts(), Counting::new(Duration::ZERO)).unwrap();
    let err = renderer.try_render(&track("blocked")).await.unwrap_err();
    assert!(matches!(err, ThumbError::Persist(_)), "{err}");

    let fallback = renderer.render(&track("blocked")).await;
    assert_eq!(fallback, PathBuf::from("assets/default_thumbnail.png"));
    assert_eq!(fallback, renderer.default_thumbnail());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn unsafe_id_returns_default_path_without_fetching() {
    let dir = temp_dir("unsafe_id");
    let renderer = Renderer::with_source(config_in(&dir), fonts(), NoFetch).unwrap();

    let err = renderer.try_render(&track("../escape")).await.unwrap_err();
    assert!(matches!(err, ThumbError::InvalidTrackId(_)));
    assert_eq!(renderer.render(&track("")).await, dir.join("default.png"));
    assert!(!dir.join("escape.png").exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_renders_of_one_id_fetch_once() {
    let dir = temp_dir("concurrent");
    let source = Counting::new(Duration::from_millis(50));
    let renderer =
        Arc::new(Renderer::with_source(config_in(&dir), fonts(), source.clone()).unwrap());

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let renderer = Arc::clone(&renderer);
        tasks.push(tokio::spawn(async move {
            renderer.render(&track("race")).await
        }));
    }
    let mut paths = Vec::new();
    for task in tasks {
        paths.push(task.await.unwrap());
    }

    let expected = dir.join("cache").join("race.png");
    assert!(paths.iter().all(|p| *p == expected));
    assert_eq!(source.calls(), 1);

    let entries: Vec<_> = std::fs::read_dir(dir.join("cache"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("race.png")]);
    let img = image::open(&expected).unwrap();
    assert_eq!((img.width(), img.height()), (1280, 720));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn distinct_ids_render_independently() {
    let dir = temp_dir("distinct");
    let source = Counting::new(Duration::ZERO);
    let renderer = Renderer::with_source(config_in(&dir), fonts(), source.clone()).unwrap();

    let a = renderer.render(&track("a")).await;
    let b = renderer.render(&track("b")).await;
    assert_ne!(a, b);
    assert!(a.is_file() && b.is_file());
    assert_eq!(source.calls(), 2);

    std::fs::remove_dir_all(&dir).ok();
}
