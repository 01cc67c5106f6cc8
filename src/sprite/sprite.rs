use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Four-sided inset reserved around a sprite for 9-slice rendering.
///
/// Packing never reads or changes it; it only travels with the sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BorderInset {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl BorderInset {
    pub fn new(left: u32, right: u32, top: u32, bottom: u32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Same inset on all four sides
    pub fn uniform(inset: u32) -> Self {
        Self::new(inset, inset, inset, inset)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// A named image waiting to be packed into an atlas
#[derive(Debug, Clone)]
pub struct SpriteImage {
    /// Unique identifier within an atlas
    pub name: String,
    /// RGBA pixel data
    pub image: RgbaImage,
    /// Inset to apply; `None` means "keep whatever the atlas already has"
    pub border: Option<BorderInset>,
    /// Whether `image` may be copied directly. When false the pixels must go
    /// through a [`Readback`](super::Readback) before they can be packed.
    pub readable: bool,
}

impl SpriteImage {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image,
            border: None,
            readable: true,
        }
    }

    pub fn with_border(mut self, border: BorderInset) -> Self {
        self.border = Some(border);
        self
    }

    /// Mark the pixels as not directly readable
    pub fn locked(mut self) -> Self {
        self.readable = false;
        self
    }

    pub fn is_directly_readable(&self) -> bool {
        self.readable
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
