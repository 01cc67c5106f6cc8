use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;

use super::ResourceProvider;
use crate::error::{AtlasError, Result};
use crate::sprite::SpriteImage;

/// Extensions of image files picked up from directories
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Decode encoded image bytes to an RGBA sprite named `name`
pub fn decode_image(path: &str, name: &str, bytes: &[u8]) -> Result<SpriteImage> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| AtlasError::Decode {
            path: path.to_string(),
            source: e,
        })?
        .into_rgba8();

    debug!(
        "Decoded '{}' as '{}' ({}x{})",
        path,
        name,
        image.width(),
        image.height()
    );
    Ok(SpriteImage::new(name, image))
}

/// Load and decode a single resource.
///
/// The resource is read fully and released before decoding starts.
pub fn load_image(provider: &dyn ResourceProvider, path: &str, name: &str) -> Result<SpriteImage> {
    let bytes = provider.read(path)?;
    decode_image(path, name, &bytes)
}

/// Load `prefix + name + ".png"` for every name, keeping input order.
///
/// Decoding runs in parallel; any failure aborts the whole load.
pub fn load_sprites<S>(
    provider: &dyn ResourceProvider,
    prefix: &str,
    names: &[S],
) -> Result<Vec<SpriteImage>>
where
    S: AsRef<str> + Sync,
{
    if names.is_empty() {
        return Err(AtlasError::NoImages);
    }

    info!("Loading {} images...", names.len());

    names
        .par_iter()
        .map(|name| {
            let name = name.as_ref();
            let path = format!("{}{}.png", prefix, name);
            load_image(provider, &path, name)
        })
        .collect()
}

/// An image file and the directory its sprite name is relative to
struct ImagePath {
    path: PathBuf,
    base: Option<PathBuf>,
}

/// Load image files and directories of images from disk.
///
/// Directories are walked recursively in sorted order and their images are
/// named relative to the directory. Individual files are named relative to
/// `base_dir` when given, otherwise by file name.
pub fn load_files(inputs: &[impl AsRef<Path>], base_dir: Option<&Path>) -> Result<Vec<SpriteImage>> {
    let image_paths = collect_image_paths(inputs, base_dir)?;

    if image_paths.is_empty() {
        return Err(AtlasError::NoImages);
    }

    info!("Loading {} images...", image_paths.len());

    image_paths
        .par_iter()
        .map(|img_path| {
            let display = img_path.path.display().to_string();
            let bytes = std::fs::read(&img_path.path).map_err(|e| AtlasError::ResourceRead {
                path: display.clone(),
                source: e,
            })?;
            let name = sprite_name_for(&img_path.path, img_path.base.as_deref());
            decode_image(&display, &name, &bytes)
        })
        .collect()
}

fn collect_image_paths(
    inputs: &[impl AsRef<Path>],
    base_dir: Option<&Path>,
) -> Result<Vec<ImagePath>> {
    let mut paths = Vec::new();

    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(AtlasError::ResourceNotFound(path.display().to_string()));
        }

        if path.is_file() {
            if is_supported_image(path) {
                paths.push(ImagePath {
                    path: path.to_path_buf(),
                    base: base_dir.map(Path::to_path_buf),
                });
            }
        } else if path.is_dir() {
            collect_from_directory(path, path, &mut paths)?;
        }
    }

    Ok(paths)
}

fn collect_from_directory(base: &Path, dir: &Path, paths: &mut Vec<ImagePath>) -> Result<()> {
    let read_err = |e| AtlasError::ResourceRead {
        path: dir.display().to_string(),
        source: e,
    };

    let mut entries = std::fs::read_dir(dir)
        .map_err(read_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(read_err)?;
    // read_dir order is platform dependent
    entries.sort();

    for path in entries {
        if path.is_file() && is_supported_image(&path) {
            paths.push(ImagePath {
                path,
                base: Some(base.to_path_buf()),
            });
        } else if path.is_dir() {
            collect_from_directory(base, &path, paths)?;
        }
    }

    Ok(())
}

/// Sprite name for an image file: its path relative to `base`, or the file
/// name when there is no base. The extension is dropped.
pub fn sprite_name_for(path: &Path, base: Option<&Path>) -> String {
    let relative = base
        .and_then(|b| path.strip_prefix(b).ok())
        .unwrap_or_else(|| Path::new(path.file_name().unwrap_or(path.as_os_str())));

    let stem = relative.with_extension("");
    stem.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
