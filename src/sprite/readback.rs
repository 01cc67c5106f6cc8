use image::{RgbaImage, imageops};
use log::debug;

use crate::error::{AtlasError, Result};

/// Produces a CPU-readable copy of pixels that cannot be read directly,
/// e.g. textures that only live on the GPU.
pub trait Readback {
    fn read_back(&self, name: &str, pixels: &RgbaImage) -> Result<RgbaImage>;
}

/// Render-then-read readback.
///
/// Blits the source into a temporary render target of the same size, then
/// copies the target into a fresh buffer. The target is dropped before
/// returning so no intermediate buffer outlives the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlitReadback;

impl Readback for BlitReadback {
    fn read_back(&self, name: &str, pixels: &RgbaImage) -> Result<RgbaImage> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(AtlasError::Readback {
                name: name.to_string(),
                message: "empty pixel buffer".to_string(),
            });
        }

        let mut target = RgbaImage::new(width, height);
        imageops::replace(&mut target, pixels, 0, 0);

        let copy = RgbaImage::from_raw(width, height, target.as_raw().clone()).ok_or_else(|| {
            AtlasError::Readback {
                name: name.to_string(),
                message: format!("render target does not hold {}x{} pixels", width, height),
            }
        })?;
        drop(target);

        debug!("Read back '{}' ({}x{})", name, width, height);
        Ok(copy)
    }
}

impl<F> Readback for F
where
    F: Fn(&str, &RgbaImage) -> Result<RgbaImage>,
{
    fn read_back(&self, name: &str, pixels: &RgbaImage) -> Result<RgbaImage> {
        self(name, pixels)
    }
}
