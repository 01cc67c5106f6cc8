use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, ImageReader, RgbaImage};
use log::debug;

use crate::atlas::Atlas;
use crate::cli::CompressionLevel;
use crate::error::{AtlasError, Result};

/// Save the atlas bitmap as PNG at `path`
pub fn save_atlas_image(
    atlas: &Atlas,
    path: &Path,
    compress: Option<CompressionLevel>,
) -> Result<()> {
    let bytes = encode_png(atlas.image(), compress).map_err(|e| match e {
        EncodeError::Image(source) => AtlasError::ImageSave {
            path: path.to_path_buf(),
            source,
        },
        EncodeError::Compress(message) => AtlasError::PngCompress {
            path: path.to_path_buf(),
            message,
        },
    })?;

    fs::write(path, bytes).map_err(|e| AtlasError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

enum EncodeError {
    Image(image::ImageError),
    Compress(String),
}

/// PNG bytes for `image`, recompressed with oxipng when a level is given
fn encode_png(
    image: &RgbaImage,
    compress: Option<CompressionLevel>,
) -> std::result::Result<Vec<u8>, EncodeError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(EncodeError::Image)?;
    let plain = out.into_inner();

    let Some(level) = compress else {
        return Ok(plain);
    };

    let options = match level {
        CompressionLevel::Level(n) => oxipng::Options::from_preset(n),
        CompressionLevel::Max => oxipng::Options::max_compression(),
    };
    let optimized = oxipng::optimize_from_memory(&plain, &options)
        .map_err(|e| EncodeError::Compress(e.to_string()))?;

    debug!(
        "oxipng {:?}: {} -> {} bytes",
        level,
        plain.len(),
        optimized.len()
    );
    Ok(optimized)
}

/// Load a previously saved atlas bitmap
pub fn load_atlas_image(path: &Path) -> Result<RgbaImage> {
    let load_err = |source: image::ImageError| AtlasError::ImageLoad {
        path: path.to_path_buf(),
        source,
    };

    let image = ImageReader::open(path)
        .map_err(|e| load_err(e.into()))?
        .decode()
        .map_err(load_err)?;
    Ok(image.into_rgba8())
}
