use anyhow::{Context, Result};
use lmrisk_client::ModelService;
use lmrisk_decorations::{gutter_icon_svg, minimap_svg, ColorRanges};
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

const TRANSPARENT: &str = "transparent";

/// On-disk cache of rendered decoration assets.
///
/// ```text
/// <dir>/gutter/gutter_<bucket>.svg
/// <dir>/minimap/<md5 of source path>.svg
/// <dir>/minimap/<md5 of source path>.png
/// ```
#[derive(Clone, Debug)]
pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dirs(&self) -> Result<()> {
        for sub in ["gutter", "minimap"] {
            let path = self.dir.join(sub);
            fs::create_dir_all(&path)
                .await
                .with_context(|| format!("Cannot create cache dir {}", path.display()))?;
        }
        Ok(())
    }

    pub fn gutter_icon_path(&self, bucket: usize) -> PathBuf {
        self.dir.join("gutter").join(format!("gutter_{bucket}.svg"))
    }

    pub fn minimap_path(&self, source: &Path) -> PathBuf {
        self.dir
            .join("minimap")
            .join(format!("{}.svg", cache_key(source)))
    }

    pub fn thumbnail_path(&self, source: &Path) -> PathBuf {
        self.dir
            .join("minimap")
            .join(format!("{}.png", cache_key(source)))
    }

    /// One icon per color range plus the empty `gutter_0` icon. Icons are
    /// rewritten every time so a color change takes effect immediately.
    pub async fn write_gutter_icons(&self, ranges: &ColorRanges) -> Result<Vec<PathBuf>> {
        self.ensure_dirs().await?;
        let colors = std::iter::once(TRANSPARENT)
            .chain(ranges.ranges().iter().map(|range| range.color.as_str()));

        let mut written = Vec::with_capacity(ranges.len() + 1);
        for (bucket, color) in colors.enumerate() {
            let path = self.gutter_icon_path(bucket);
            fs::write(&path, gutter_icon_svg(color))
                .await
                .with_context(|| format!("Cannot write {}", path.display()))?;
            written.push(path);
        }
        log::debug!("Wrote {} gutter icon(s) to {}", written.len(), self.dir.display());
        Ok(written)
    }

    /// Minimap SVG for `source`, regenerated only when the source is newer.
    pub async fn ensure_minimap(&self, source: &Path, content: &str) -> Result<PathBuf> {
        let path = self.minimap_path(source);
        if is_fresh(&path, source).await {
            return Ok(path);
        }
        self.ensure_dirs().await?;
        fs::write(&path, minimap_svg(content))
            .await
            .with_context(|| format!("Cannot write {}", path.display()))?;
        Ok(path)
    }

    /// Rendered thumbnail for `source`. Returns `None` when the backend cannot
    /// render one.
    pub async fn ensure_thumbnail(
        &self,
        service: &dyn ModelService,
        source: &Path,
        content: &str,
    ) -> Result<Option<PathBuf>> {
        let path = self.thumbnail_path(source);
        if is_fresh(&path, source).await {
            return Ok(Some(path));
        }
        let bytes = match service.thumbnail(content).await {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("Thumbnail for {} failed: {err}", source.display());
                return Ok(None);
            }
        };
        self.ensure_dirs().await?;
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("Cannot write {}", path.display()))?;
        Ok(Some(path))
    }
}

/// Hex md5 of the path string.
pub fn cache_key(source: &Path) -> String {
    let mut hasher = Md5::new();
    hasher.update(source.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

async fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).await.ok()?.modified().ok()
}

/// A cached asset is fresh when it is at least as new as its source.
async fn is_fresh(asset: &Path, source: &Path) -> bool {
    match (modified(asset).await, modified(source).await) {
        (Some(asset), Some(source)) => asset >= source,
        _ => false,
    }
}
