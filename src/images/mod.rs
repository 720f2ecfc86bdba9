//! Image loading from local paths and URLs
//!
//! Remote images are downloaded once and cached on disk under a
//! BLAKE3-addressed path. Loaded images keep their encoded bytes, and the
//! format is detected from content rather than from the file name.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to read image {source_path}: {error}")]
    Read {
        source_path: String,
        error: std::io::Error,
    },

    #[error("Failed to fetch image {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to decode image {source_path}: {reason}")]
    Decode { source_path: String, reason: String },

    #[error("Image cache error: {0}")]
    Cache(String),
}

/// An image known to decode, with its encoded bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    /// Path or URL the image was requested by
    pub source: String,
    /// Local file holding the image bytes
    pub path: PathBuf,
    /// Encoded image data as read from `path`
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

/// Loads images by path or URL, verifying they decode
pub struct ImageLoader {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl ImageLoader {
    /// Create a loader that caches remote images under `cache_dir`
    pub fn new(cache_dir: PathBuf, timeout: Duration) -> Result<Self, ImageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageError::Cache(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Load and decode a single image
    pub async fn load(&self, source: &str) -> Result<LoadedImage, ImageError> {
        if is_remote(source) {
            self.load_remote(source).await
        } else {
            load_local(source).await
        }
    }

    /// Load every source, logging and skipping the ones that fail
    ///
    /// Returns the position of each loaded source alongside the image.
    pub async fn load_all<S: AsRef<str>>(&self, sources: &[S]) -> Vec<(usize, LoadedImage)> {
        let mut loaded = Vec::with_capacity(sources.len());

        for (idx, source) in sources.iter().enumerate() {
            match self.load(source.as_ref()).await {
                Ok(image) => loaded.push((idx, image)),
                Err(e) => warn!(source = source.as_ref(), error = %e, "Skipping image"),
            }
        }

        loaded
    }

    async fn load_remote(&self, url: &str) -> Result<LoadedImage, ImageError> {
        let cached = self.cache_path(url);

        if cached.exists() {
            debug!(url, path = %cached.display(), "Image cache hit");
            let bytes = tokio::fs::read(&cached)
                .await
                .map_err(|error| ImageError::Read {
                    source_path: cached.display().to_string(),
                    error,
                })?;
            return decode(url, cached, bytes);
        }

        let bytes = self.fetch(url).await?;
        // Only decodable images are written to the cache
        let image = decode(url, cached, bytes)?;
        write_atomic(&image.path, &image.bytes)?;

        Ok(image)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        let fetch_error = |reason: String| ImageError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_error(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    /// Sharded cache location: cache/ab/cd/abcd...<ext>
    fn cache_path(&self, url: &str) -> PathBuf {
        let hash = blake3::hash(url.as_bytes()).to_hex();
        let hash = &hash.as_str()[..32];
        let extension = Path::new(url.split(['?', '#']).next().unwrap_or(url))
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "img".to_string());

        self.cache_dir
            .join(&hash[0..2])
            .join(&hash[2..4])
            .join(format!("{}.{}", hash, extension))
    }
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn load_local(source: &str) -> Result<LoadedImage, ImageError> {
    let bytes = tokio::fs::read(source)
        .await
        .map_err(|error| ImageError::Read {
            source_path: source.to_string(),
            error,
        })?;

    decode(source, PathBuf::from(source), bytes)
}

fn decode(source: &str, path: PathBuf, bytes: Vec<u8>) -> Result<LoadedImage, ImageError> {
    let image = image::load_from_memory(&bytes).map_err(|e| ImageError::Decode {
        source_path: source.to_string(),
        reason: e.to_string(),
    })?;

    Ok(LoadedImage {
        source: source.to_string(),
        path,
        width: image.width(),
        height: image.height(),
        bytes: bytes.into(),
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ImageError> {
    let parent = path
        .parent()
        .ok_or_else(|| ImageError::Cache(format!("Invalid cache path: {}", path.display())))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        ImageError::Cache(format!("Failed to create {}: {}", parent.display(), e))
    })?;

    let temp_path = path.with_extension("tmp");
    let mut file = std::fs::File::create(&temp_path).map_err(|e| {
        ImageError::Cache(format!("Failed to create {}: {}", temp_path.display(), e))
    })?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| ImageError::Cache(format!("Failed to write {}: {}", temp_path.display(), e)))?;
    drop(file);

    std::fs::rename(&temp_path, path).map_err(|e| {
        ImageError::Cache(format!(
            "Failed to rename {} -> {}: {}",
            temp_path.display(),
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn loader(temp: &TempDir) -> ImageLoader {
        ImageLoader::new(temp.path().join("cache"), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_load_local_png() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tile.png");
        image::RgbImage::new(4, 3).save(&path).unwrap();

        let loaded = loader(&temp).load(path.to_str().unwrap()).await.unwrap();
        assert_eq!((loaded.width, loaded.height), (4, 3));
        assert_eq!(loaded.path, path);
    }

    #[tokio::test]
    async fn test_undecodable_file_is_decode_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = loader(&temp).load(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, ImageError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.png");

        let err = loader(&temp).load(missing.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, ImageError::Read { .. }));
    }

    #[tokio::test]
    async fn test_load_all_skips_failures() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.png");
        image::RgbImage::new(2, 2).save(&good).unwrap();
        let bad = temp.path().join("bad.png");
        std::fs::write(&bad, b"nope").unwrap();

        let sources = vec![
            bad.display().to_string(),
            good.display().to_string(),
        ];
        let loaded = loader(&temp).load_all(&sources).await;

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, 1);
    }

    #[tokio::test]
    async fn test_extensionless_url_loads_from_cache_by_content() {
        let temp = TempDir::new().unwrap();
        let loader = loader(&temp);
        let url = "https://cdn.example.org/image?id=7";

        // Seed the cache so the load needs no network
        let cached = loader.cache_path(url);
        assert_eq!(cached.extension().unwrap(), "img");
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        image::RgbImage::new(5, 2)
            .save_with_format(&cached, image::ImageFormat::Png)
            .unwrap();

        let loaded = loader.load(url).await.unwrap();
        assert_eq!(loaded.source, url);
        assert_eq!((loaded.width, loaded.height), (5, 2));
        assert_eq!(
            image::guess_format(&loaded.bytes).unwrap(),
            image::ImageFormat::Png
        );
    }

    #[test]
    fn test_cache_path_is_sharded_and_stable() {
        let temp = TempDir::new().unwrap();
        let loader = loader(&temp);
        let url = "https://example.org/art/Horse.JPG?size=large";

        let first = loader.cache_path(url);
        assert_eq!(first, loader.cache_path(url));
        assert_eq!(first.extension().unwrap(), "jpg");
        assert!(first.starts_with(temp.path().join("cache")));
        assert_eq!(first.components().count(), loader.cache_dir().components().count() + 3);
    }
}
