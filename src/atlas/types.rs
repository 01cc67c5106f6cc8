use std::collections::HashMap;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::packing::Rect;
use crate::sprite::{BorderInset, SpriteImage};

/// Sprite location as fractions of the atlas bitmap size, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackedRegion {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "w")]
    pub width: f32,
    #[serde(rename = "h")]
    pub height: f32,
}

impl PackedRegion {
    pub fn from_frame(frame: &Rect, atlas_width: u32, atlas_height: u32) -> Self {
        let aw = atlas_width.max(1) as f32;
        let ah = atlas_height.max(1) as f32;
        Self {
            x: frame.x as f32 / aw,
            y: frame.y as f32 / ah,
            width: frame.width as f32 / aw,
            height: frame.height as f32 / ah,
        }
    }
}

/// One sprite placed inside an atlas
#[derive(Debug, Clone)]
pub struct AtlasSprite {
    pub name: String,
    /// The sprite's own pixels, kept so the atlas can be re-packed later
    pub image: RgbaImage,
    pub readable: bool,
    pub border: BorderInset,
    /// Placement in atlas pixels
    pub frame: Rect,
    pub region: PackedRegion,
}

impl AtlasSprite {
    pub fn to_sprite_image(&self) -> SpriteImage {
        SpriteImage {
            name: self.name.clone(),
            image: self.image.clone(),
            border: Some(self.border),
            readable: self.readable,
        }
    }
}

/// A packed texture atlas
#[derive(Debug, Clone)]
pub struct Atlas {
    name: String,
    max_dimension: u32,
    padding: u32,
    image: RgbaImage,
    sprites: Vec<AtlasSprite>,
    index: HashMap<String, usize>,
}

impl Atlas {
    pub(crate) fn new(
        name: impl Into<String>,
        max_dimension: u32,
        padding: u32,
        image: RgbaImage,
        sprites: Vec<AtlasSprite>,
    ) -> Self {
        let mut atlas = Self {
            name: name.into(),
            max_dimension,
            padding,
            image,
            sprites,
            index: HashMap::new(),
        };
        atlas.rebuild_index();
        atlas
    }

    /// An atlas with no sprites and a 1x1 transparent bitmap
    pub fn empty(name: impl Into<String>, max_dimension: u32, padding: u32) -> Self {
        Self::new(name, max_dimension, padding, RgbaImage::new(1, 1), Vec::new())
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .sprites
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper bound on either side of the bitmap, fixed at creation
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Minimum gap in pixels between neighbouring sprites
    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Rendered atlas bitmap
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Sprites in packing order
    pub fn sprites(&self) -> &[AtlasSprite] {
        &self.sprites
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn sprite(&self, name: &str) -> Option<&AtlasSprite> {
        self.index.get(name).map(|&i| &self.sprites[i])
    }

    pub fn region(&self, name: &str) -> Option<PackedRegion> {
        self.sprite(name).map(|s| s.region)
    }

    pub fn sprite_names(&self) -> impl Iterator<Item = &str> {
        self.sprites.iter().map(|s| s.name.as_str())
    }

    /// Images for the requested names, in request order.
    ///
    /// Names not present in the atlas are skipped, so the result may be
    /// shorter than `names`.
    pub fn find_images<S: AsRef<str>>(&self, names: &[S]) -> Vec<SpriteImage> {
        names
            .iter()
            .filter_map(|name| self.sprite(name.as_ref()))
            .map(AtlasSprite::to_sprite_image)
            .collect()
    }
}
