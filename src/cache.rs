//! On-disk thumbnail cache keyed by track id.
//!
//! Layout is `{dir}/{id}.png` and nothing else: no manifest, no sidecars. Entries are never
//! invalidated, so existence alone is authoritative.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context as _;
use image::RgbaImage;

use crate::foundation::error::{ThumbError, ThumbResult};

const EXTENSION: &str = "png";
/// Leaves room for the extension and the temp suffix within common 255-byte name limits.
const MAX_ID_BYTES: usize = 200;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug)]
pub struct ThumbnailCache {
    dir: PathBuf,
}

impl ThumbnailCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Canonical output path for `id`.
    ///
    /// Rejects ids that are not a single plain file-name component.
    pub fn path_for(&self, id: &str) -> ThumbResult<PathBuf> {
        validate_track_id(id)?;
        Ok(self.dir.join(format!("{id}.{EXTENSION}")))
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// The cached path for `id`, if a render is already on disk.
    pub fn lookup(&self, id: &str) -> ThumbResult<Option<PathBuf>> {
        let path = self.path_for(id)?;
        Ok(self.exists(&path).then_some(path))
    }

    /// Encode `canvas` as PNG and publish it at the canonical path for `id`.
    ///
    /// The bytes land in a temp sibling first and are renamed into place, so readers never
    /// observe a partially written file.
    pub fn store(&self, id: &str, canvas: &RgbaImage) -> ThumbResult<PathBuf> {
        let path = self.path_for(id)?;

        let mut png = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| ThumbError::persist(format!("encode png for '{id}': {e}")))?;

        write_atomic(&self.dir, &path, &png)
            .map_err(|e| ThumbError::persist(format!("{e:#}")))?;
        Ok(path)
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create cache dir '{}'", dir.display()))?;

    let tmp = temp_sibling(path);
    std::fs::write(&tmp, bytes).with_context(|| format!("write '{}'", tmp.display()))?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("publish '{}'", path.display()));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{seq}.tmp", std::process::id()));
    path.with_file_name(name)
}

pub fn validate_track_id(id: &str) -> ThumbResult<()> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.len() > MAX_ID_BYTES
        || id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control());
    if bad {
        return Err(ThumbError::invalid_track_id(id));
    }
    Ok(())
}
