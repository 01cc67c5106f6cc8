use std::fs;
use std::path::{Path, PathBuf};

use image::imageops;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::atlas::{Atlas, AtlasSprite, PackedRegion};
use crate::error::{AtlasError, Result};
use crate::output::{atlas_png_filename, load_atlas_image};
use crate::packing::Rect;
use crate::sprite::BorderInset;

#[derive(Serialize, Deserialize)]
struct JsonOutput {
    meta: Meta,
    atlas: JsonAtlas,
    sprites: Vec<JsonSprite>,
}

#[derive(Serialize, Deserialize)]
struct Meta {
    app: String,
    version: String,
    format: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonAtlas {
    name: String,
    image: String,
    size: Size,
    max_dimension: u32,
    padding: u32,
}

#[derive(Serialize, Deserialize)]
struct Size {
    w: u32,
    h: u32,
}

#[derive(Serialize, Deserialize)]
struct JsonSprite {
    name: String,
    frame: Rect,
    region: PackedRegion,
    #[serde(default)]
    border: BorderInset,
}

/// Write `<base_name>.json` describing the atlas saved as `<base_name>.png`.
/// Returns the path written.
pub fn write_json(atlas: &Atlas, output_dir: &Path, base_name: &str) -> Result<PathBuf> {
    let output = JsonOutput {
        meta: Meta {
            app: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "rgba8888".to_string(),
        },
        atlas: JsonAtlas {
            name: atlas.name().to_string(),
            image: atlas_png_filename(base_name),
            size: Size {
                w: atlas.width(),
                h: atlas.height(),
            },
            max_dimension: atlas.max_dimension(),
            padding: atlas.padding(),
        },
        sprites: atlas.sprites().iter().map(sprite_to_json).collect(),
    };

    let json_path = output_dir.join(format!("{}.json", base_name));
    let content = serde_json::to_string_pretty(&output).map_err(|e| AtlasError::MetadataParse {
        path: json_path.clone(),
        source: e,
    })?;

    fs::write(&json_path, content).map_err(|e| AtlasError::OutputWrite {
        path: json_path.clone(),
        source: e,
    })?;

    Ok(json_path)
}

fn sprite_to_json(sprite: &AtlasSprite) -> JsonSprite {
    JsonSprite {
        name: sprite.name.clone(),
        frame: sprite.frame,
        region: sprite.region,
        border: sprite.border,
    }
}

/// Rebuild an atlas from its JSON metadata and the bitmap next to it.
///
/// Each sprite's pixels are cut back out of the bitmap so the atlas can be
/// merged again.
pub fn load_atlas(json_path: &Path) -> Result<Atlas> {
    let content = fs::read_to_string(json_path).map_err(|e| AtlasError::MetadataRead {
        path: json_path.to_path_buf(),
        source: e,
    })?;
    let parsed: JsonOutput =
        serde_json::from_str(&content).map_err(|e| AtlasError::MetadataParse {
            path: json_path.to_path_buf(),
            source: e,
        })?;

    let dir = json_path.parent().unwrap_or_else(|| Path::new("."));
    let image_path = dir.join(&parsed.atlas.image);
    let image = load_atlas_image(&image_path)?;
    let bounds = Rect::new(0, 0, image.width(), image.height());

    let sprites = parsed
        .sprites
        .into_iter()
        .map(|s| {
            if s.frame.is_empty() || !bounds.contains(&s.frame) {
                return Err(AtlasError::FrameOutOfBounds {
                    path: image_path.clone(),
                    name: s.name,
                });
            }
            let pixels = imageops::crop_imm(
                &image,
                s.frame.x,
                s.frame.y,
                s.frame.width,
                s.frame.height,
            )
            .to_image();

            Ok(AtlasSprite {
                name: s.name,
                image: pixels,
                readable: true,
                border: s.border,
                frame: s.frame,
                region: PackedRegion::from_frame(&s.frame, image.width(), image.height()),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Loaded atlas '{}' with {} sprites from {}",
        parsed.atlas.name,
        sprites.len(),
        json_path.display()
    );

    Ok(Atlas::new(
        parsed.atlas.name,
        parsed.atlas.max_dimension,
        parsed.atlas.padding,
        image,
        sprites,
    ))
}
