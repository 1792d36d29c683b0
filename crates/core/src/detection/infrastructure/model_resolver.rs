use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("no model asset configured")]
    Empty,
    #[error("model file not found: {0}")]
    NotFound(PathBuf),
    #[error("cannot derive a file name from model URL {0}")]
    UnnamedUrl(String),
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Turn a configured model asset into a local file path.
///
/// Local paths must exist. http(s) URLs are resolved through
/// [`resolve`] under the file name taken from the URL's last segment.
pub fn resolve_asset(
    asset: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let asset = asset.trim();
    if asset.is_empty() {
        return Err(ModelResolveError::Empty);
    }
    if is_remote(asset) {
        let name = file_name_from_url(asset)?;
        return resolve(&name, asset, bundled_dir, progress);
    }
    let path = PathBuf::from(asset);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ModelResolveError::NotFound(path))
    }
}

/// Resolve a model file by name, checking cache locations before downloading.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. Bundled path (for development / pre-packaged installs)
/// 3. Download from URL to cache
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(bundled_path) = bundled_dir.map(|d| d.join(name)) {
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading model {name} from {url}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceCapture/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceCapture/models/` or `~/.cache/FaceCapture/models/`
/// - Windows: `%LOCALAPPDATA%/FaceCapture/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let root = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let root = dirs::cache_dir();

    root.map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn is_remote(asset: &str) -> bool {
    asset.starts_with("http://") || asset.starts_with("https://")
}

fn file_name_from_url(url: &str) -> Result<String, ModelResolveError> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let name = without_query.rsplit('/').next().unwrap_or_default();
    if name.is_empty() || !name.contains('.') {
        return Err(ModelResolveError::UnnamedUrl(url.to_string()));
    }
    Ok(name.to_string())
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = stream_to_file(url, &temp_path, progress).and_then(|()| {
        fs::rename(&temp_path, dest).map_err(|e| write_error(dest, e))
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn stream_to_file(
    url: &str,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut file = fs::File::create(temp_path).map_err(|e| write_error(temp_path, e))?;
    let mut buf = vec![0u8; 256 * 1024];
    let mut downloaded: u64 = 0;
    loop {
        let n = response
            .read(&mut buf)
            .map_err(|e| write_error(temp_path, e))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])
            .map_err(|e| write_error(temp_path, e))?;
        downloaded += n as u64;
        if let Some(cb) = progress.as_ref() {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(|e| write_error(temp_path, e))
}

fn write_error(path: &Path, source: std::io::Error) -> ModelResolveError {
    ModelResolveError::Write {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_asset_accepts_existing_local_file() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("blaze_face_short_range.onnx");
        fs::write(&model, b"fake model").unwrap();

        let resolved = resolve_asset(model.to_str().unwrap(), None, None).unwrap();
        assert_eq!(resolved, model);
    }

    #[test]
    fn test_resolve_asset_missing_local_file() {
        let result = resolve_asset("/nonexistent/model.onnx", None, None);
        assert!(matches!(result, Err(ModelResolveError::NotFound(_))));
    }

    #[test]
    fn test_resolve_asset_rejects_empty() {
        assert!(matches!(
            resolve_asset("  ", None, None),
            Err(ModelResolveError::Empty)
        ));
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://example.com/models/face/1/blaze.onnx").unwrap(),
            "blaze.onnx"
        );
        assert_eq!(
            file_name_from_url("https://example.com/m.onnx?download=1").unwrap(),
            "m.onnx"
        );
        assert!(file_name_from_url("https://example.com/").is_err());
        assert!(file_name_from_url("https://example.com/models/latest").is_err());
    }

    #[test]
    fn test_model_cache_dir_is_namespaced() {
        let path = model_cache_dir().unwrap();
        assert!(path.ends_with(Path::new(APP_DIR_NAME).join("models")));
    }

    #[test]
    fn test_download_failure_leaves_no_files() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download("http://invalid.nonexistent.example.com/model.onnx", &dest, None);
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
