use std::collections::{HashMap, HashSet};

use clap::ValueEnum;
use image::{RgbaImage, imageops};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{Atlas, AtlasSprite, PackedRegion};
use crate::error::{AtlasError, Result};
use crate::packing::{ALL_HEURISTICS, MaxRectsPacker, PackMode, PackingHeuristic, Rect};
use crate::sprite::{BorderInset, Readback, SpriteImage};

/// Default side limit for newly created atlases
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;
/// Default gap between sprites
pub const DEFAULT_PADDING: u32 = 2;

/// What a merge does when a new image has the name of an existing sprite
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameConflict {
    /// The new image takes the old sprite's slot. The old border inset is
    /// kept unless the new image supplies one.
    #[default]
    Replace,
    /// Fail the merge with `DuplicateName`
    Reject,
}

/// Sprite orderings tried when the pack mode is `Best`
#[derive(Debug, Clone, Copy)]
enum SpriteOrdering {
    /// Keep original input order
    Original,
    /// Sort by area (largest first)
    ByArea,
    /// Sort by perimeter (largest first)
    ByPerimeter,
    /// Sort by max dimension (largest first)
    ByMaxDimension,
    /// Sort by width (widest first)
    ByWidth,
    /// Sort by height (tallest first)
    ByHeight,
}

const ALL_ORDERINGS: [SpriteOrdering; 6] = [
    SpriteOrdering::Original,
    SpriteOrdering::ByArea,
    SpriteOrdering::ByPerimeter,
    SpriteOrdering::ByMaxDimension,
    SpriteOrdering::ByWidth,
    SpriteOrdering::ByHeight,
];

/// Atlas packing configuration
#[derive(Debug, Clone)]
pub struct AtlasBuilder {
    pub max_dimension: u32,
    pub padding: u32,
    pub heuristic: PackingHeuristic,
    pub pack_mode: PackMode,
    pub on_conflict: NameConflict,
}

/// A sprite ready for placement, pixels already readable
struct PackEntry {
    name: String,
    image: RgbaImage,
    readable: bool,
    border: BorderInset,
}

impl PackEntry {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Result of one packing attempt, frames indexed like the entries
struct PackingLayout {
    frames: Vec<Option<Rect>>,
    placed: usize,
    max_x: u32,
    max_y: u32,
    occupancy: f64,
}

impl PackingLayout {
    /// Priority: 1) more sprites placed, 2) smaller covered area, 3) higher occupancy.
    fn is_better_than(&self, other: &PackingLayout) -> bool {
        if self.placed != other.placed {
            return self.placed > other.placed;
        }

        let self_area = u64::from(self.max_x) * u64::from(self.max_y);
        let other_area = u64::from(other.max_x) * u64::from(other.max_y);
        if self_area != other_area {
            return self_area < other_area;
        }

        self.occupancy > other.occupancy
    }
}

impl Default for AtlasBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}

impl AtlasBuilder {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension,
            padding: DEFAULT_PADDING,
            heuristic: PackingHeuristic::BestShortSideFit,
            pack_mode: PackMode::Single,
            on_conflict: NameConflict::Replace,
        }
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn heuristic(mut self, heuristic: PackingHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn pack_mode(mut self, pack_mode: PackMode) -> Self {
        self.pack_mode = pack_mode;
        self
    }

    pub fn on_conflict(mut self, on_conflict: NameConflict) -> Self {
        self.on_conflict = on_conflict;
        self
    }

    /// Pack `images` into a new atlas.
    ///
    /// Fails with `PackingOverflow` rather than dropping or shrinking sprites
    /// when they do not all fit in `max_dimension` x `max_dimension`.
    pub fn create(&self, name: &str, images: Vec<SpriteImage>) -> Result<Atlas> {
        if images.is_empty() {
            return Err(AtlasError::NoImages);
        }
        check_unique_names(name, &images)?;

        let entries = images
            .into_iter()
            .map(|img| {
                if !img.readable {
                    return Err(AtlasError::NotReadable { name: img.name });
                }
                Ok(PackEntry {
                    name: img.name,
                    image: img.image,
                    readable: true,
                    border: img.border.unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.pack(name, self.max_dimension, self.padding, entries)
    }

    /// Build a new atlas holding every sprite of `atlas` followed by `new_images`.
    ///
    /// The whole set is re-packed with the atlas's own `max_dimension` and
    /// `padding`, so existing sprites may move. `atlas` itself is left
    /// untouched, including on error.
    ///
    /// With `readback` set, every existing sprite (and any new image that is
    /// not directly readable) is copied through it before packing. Without
    /// it, unreadable pixels fail with `NotReadable`.
    pub fn merge(
        &self,
        atlas: &Atlas,
        new_images: Vec<SpriteImage>,
        readback: Option<&dyn Readback>,
    ) -> Result<Atlas> {
        check_unique_names(atlas.name(), &new_images)?;

        let replaced: HashSet<String> = new_images
            .iter()
            .filter(|img| atlas.contains(&img.name))
            .map(|img| img.name.clone())
            .collect();

        if self.on_conflict == NameConflict::Reject
            && let Some(img) = new_images.iter().find(|img| replaced.contains(&img.name))
        {
            return Err(AtlasError::DuplicateName {
                atlas: atlas.name().to_string(),
                name: img.name.clone(),
            });
        }

        let mut entries = Vec::with_capacity(atlas.len() + new_images.len());
        let mut slots: HashMap<String, usize> = HashMap::new();

        for sprite in atlas.sprites() {
            slots.insert(sprite.name.clone(), entries.len());
            let image = if replaced.contains(&sprite.name) {
                // Overwritten below, skip the readback
                RgbaImage::new(0, 0)
            } else {
                materialize(&sprite.name, &sprite.image, sprite.readable, readback, true)?
            };
            entries.push(PackEntry {
                name: sprite.name.clone(),
                image,
                readable: sprite.readable || readback.is_some(),
                border: sprite.border,
            });
        }

        let mut added = 0usize;
        for img in new_images {
            let image = if img.readable {
                img.image
            } else {
                materialize(&img.name, &img.image, false, readback, false)?
            };

            match slots.get(&img.name) {
                Some(&slot) => {
                    debug!("Replacing sprite '{}' in atlas '{}'", img.name, atlas.name());
                    let entry = &mut entries[slot];
                    entry.image = image;
                    entry.readable = true;
                    if let Some(border) = img.border {
                        entry.border = border;
                    }
                }
                None => {
                    added += 1;
                    entries.push(PackEntry {
                        name: img.name,
                        image,
                        readable: true,
                        border: img.border.unwrap_or_default(),
                    });
                }
            }
        }

        info!(
            "Merging {} new and {} replaced sprites into atlas '{}' ({} existing)",
            added,
            replaced.len(),
            atlas.name(),
            atlas.len()
        );

        if entries.is_empty() {
            return Ok(Atlas::empty(
                atlas.name(),
                atlas.max_dimension(),
                atlas.padding(),
            ));
        }

        self.pack(atlas.name(), atlas.max_dimension(), atlas.padding(), entries)
    }

    fn pack(
        &self,
        name: &str,
        max_dimension: u32,
        padding: u32,
        entries: Vec<PackEntry>,
    ) -> Result<Atlas> {
        for entry in &entries {
            if entry.width() == 0 || entry.height() == 0 {
                return Err(AtlasError::EmptyImage {
                    name: entry.name.clone(),
                });
            }
            if entry.width() > max_dimension || entry.height() > max_dimension {
                return Err(AtlasError::SpriteTooLarge {
                    name: entry.name.clone(),
                    width: entry.width(),
                    height: entry.height(),
                    max_dimension,
                });
            }
        }

        let layout = self.find_best_layout(&entries, max_dimension, padding);

        if layout.placed < entries.len() {
            return Err(AtlasError::PackingOverflow {
                atlas: name.to_string(),
                placed: layout.placed,
                total: entries.len(),
                max_dimension,
            });
        }

        let width = bitmap_side(layout.max_x, max_dimension);
        let height = bitmap_side(layout.max_y, max_dimension);
        let mut image = RgbaImage::new(width, height);
        let mut sprites = Vec::with_capacity(entries.len());

        for (entry, frame) in entries.into_iter().zip(layout.frames) {
            let Some(frame) = frame else {
                // placed == entries.len(), every frame is set
                continue;
            };

            imageops::replace(
                &mut image,
                &entry.image,
                i64::from(frame.x),
                i64::from(frame.y),
            );

            sprites.push(AtlasSprite {
                name: entry.name,
                image: entry.image,
                readable: entry.readable,
                border: entry.border,
                frame,
                region: PackedRegion::from_frame(&frame, width, height),
            });
        }

        info!(
            "Atlas '{}': {}x{} with {} sprites ({:.1}% efficiency)",
            name,
            width,
            height,
            sprites.len(),
            layout.occupancy * 100.0,
        );

        Ok(Atlas::new(name, max_dimension, padding, image, sprites))
    }

    fn find_best_layout(
        &self,
        entries: &[PackEntry],
        max_dimension: u32,
        padding: u32,
    ) -> PackingLayout {
        let orderings: &[SpriteOrdering] = if self.pack_mode == PackMode::Best {
            &ALL_ORDERINGS
        } else {
            &[SpriteOrdering::Original]
        };
        let heuristics: &[PackingHeuristic] = if self.heuristic == PackingHeuristic::Best {
            &ALL_HEURISTICS
        } else {
            std::slice::from_ref(&self.heuristic)
        };

        let mut best: Option<PackingLayout> = None;

        for &ordering in orderings {
            let order = sorted_indices(entries, ordering);

            for &heuristic in heuristics {
                let layout = try_pack(entries, &order, max_dimension, padding, heuristic);
                debug!(
                    "Ordering {:?} + Heuristic {:?}: placed {}/{}, occupancy {:.1}%",
                    ordering,
                    heuristic,
                    layout.placed,
                    entries.len(),
                    layout.occupancy * 100.0
                );

                let dominated = best.as_ref().is_some_and(|b| !layout.is_better_than(b));
                if !dominated {
                    best = Some(layout);
                }
            }
        }

        best.unwrap_or_else(|| PackingLayout {
            frames: vec![None; entries.len()],
            placed: 0,
            max_x: 0,
            max_y: 0,
            occupancy: 0.0,
        })
    }
}

/// Pack entries in `order`. Each sprite reserves `padding` extra pixels to
/// its right and below inside a bin enlarged by `padding`, so neighbours are
/// at least `padding` apart while frames stay within `max_dimension`.
fn try_pack(
    entries: &[PackEntry],
    order: &[usize],
    max_dimension: u32,
    padding: u32,
    heuristic: PackingHeuristic,
) -> PackingLayout {
    let bin = max_dimension.saturating_add(padding);
    let mut packer = MaxRectsPacker::new(bin, bin);
    let mut frames = vec![None; entries.len()];
    let mut placed = 0;
    let mut max_x = 0u32;
    let mut max_y = 0u32;

    for &i in order {
        let entry = &entries[i];
        // A cell that overflows u32 cannot fit the bin either
        let (Some(cell_w), Some(cell_h)) = (
            entry.width().checked_add(padding),
            entry.height().checked_add(padding),
        ) else {
            continue;
        };

        if let Some(cell) = packer.insert(cell_w, cell_h, heuristic) {
            let frame = Rect::new(cell.x, cell.y, entry.width(), entry.height());
            max_x = max_x.max(frame.right());
            max_y = max_y.max(frame.bottom());
            frames[i] = Some(frame);
            placed += 1;
        }
    }

    PackingLayout {
        frames,
        placed,
        max_x,
        max_y,
        occupancy: packer.occupancy(),
    }
}

/// Stable-sorted entry indices, so equal keys keep input order
fn sorted_indices(entries: &[PackEntry], ordering: SpriteOrdering) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..entries.len()).collect();
    let area = |i: usize| u64::from(entries[i].width()) * u64::from(entries[i].height());
    let perimeter = |i: usize| u64::from(entries[i].width()) + u64::from(entries[i].height());

    match ordering {
        SpriteOrdering::Original => {}
        SpriteOrdering::ByArea => indices.sort_by(|&a, &b| area(b).cmp(&area(a))),
        SpriteOrdering::ByPerimeter => indices.sort_by(|&a, &b| perimeter(b).cmp(&perimeter(a))),
        SpriteOrdering::ByMaxDimension => indices.sort_by(|&a, &b| {
            let max_a = entries[a].width().max(entries[a].height());
            let max_b = entries[b].width().max(entries[b].height());
            max_b.cmp(&max_a)
        }),
        SpriteOrdering::ByWidth => {
            indices.sort_by(|&a, &b| entries[b].width().cmp(&entries[a].width()))
        }
        SpriteOrdering::ByHeight => {
            indices.sort_by(|&a, &b| entries[b].height().cmp(&entries[a].height()))
        }
    }

    indices
}

/// Smallest power of two covering `extent`, capped at `max_dimension`
fn bitmap_side(extent: u32, max_dimension: u32) -> u32 {
    extent
        .max(1)
        .checked_next_power_of_two()
        .unwrap_or(max_dimension)
        .min(max_dimension)
        .max(1)
}

/// Get CPU-readable pixels for a sprite.
///
/// `force` routes readable pixels through the readback as well.
fn materialize(
    name: &str,
    pixels: &RgbaImage,
    readable: bool,
    readback: Option<&dyn Readback>,
    force: bool,
) -> Result<RgbaImage> {
    match readback {
        Some(rb) if force || !readable => rb.read_back(name, pixels),
        _ if readable => Ok(pixels.clone()),
        _ => Err(AtlasError::NotReadable {
            name: name.to_string(),
        }),
    }
}

fn check_unique_names(atlas: &str, images: &[SpriteImage]) -> Result<()> {
    let mut seen = HashSet::with_capacity(images.len());
    for img in images {
        if !seen.insert(img.name.as_str()) {
            return Err(AtlasError::DuplicateName {
                atlas: atlas.to_string(),
                name: img.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::BlitReadback;
    use image::Rgba;

    fn solid(name: &str, w: u32, h: u32, color: u8) -> SpriteImage {
        SpriteImage::new(name, RgbaImage::from_pixel(w, h, Rgba([color, color / 2, 7, 255])))
    }

    /// Every pair of frames is disjoint, `padding` apart, and inside the atlas
    fn assert_valid_layout(atlas: &Atlas) {
        let bounds = Rect::new(0, 0, atlas.max_dimension(), atlas.max_dimension());
        let sprites = atlas.sprites();
        for (i, a) in sprites.iter().enumerate() {
            assert!(bounds.contains(&a.frame), "{} out of bounds", a.name);
            assert!(a.frame.right() <= atlas.width() && a.frame.bottom() <= atlas.height());
            for b in &sprites[i + 1..] {
                let gap = a.frame.gap(&b.frame);
                assert!(
                    gap.is_some_and(|g| g >= atlas.padding()),
                    "{} and {} too close: {:?}",
                    a.name,
                    b.name,
                    gap
                );
            }
        }
    }

    fn frames(atlas: &Atlas) -> Vec<(String, Rect)> {
        atlas
            .sprites()
            .iter()
            .map(|s| (s.name.clone(), s.frame))
            .collect()
    }

    #[test]
    fn test_create_places_every_sprite() {
        let sizes = [(30, 20), (25, 15), (40, 10), (15, 35), (20, 20), (64, 8)];
        let images = sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| solid(&format!("s{}", i), w, h, 10 * i as u8))
            .collect();

        let atlas = AtlasBuilder::new(128).padding(2).create("ui", images).unwrap();

        assert_eq!(atlas.len(), sizes.len());
        assert_eq!(atlas.padding(), 2);
        assert_valid_layout(&atlas);
        for (sprite, &(w, h)) in atlas.sprites().iter().zip(&sizes) {
            assert_eq!((sprite.frame.width, sprite.frame.height), (w, h));
        }
    }

    #[test]
    fn test_every_heuristic_respects_padding() {
        let heuristics = ALL_HEURISTICS.iter().copied().chain([PackingHeuristic::Best]);
        for heuristic in heuristics {
            for mode in [PackMode::Single, PackMode::Best] {
                let images = (0..12)
                    .map(|i| solid(&format!("s{}", i), 5 + i * 3, 30 - i * 2, 40))
                    .collect();
                let atlas = AtlasBuilder::new(128)
                    .padding(3)
                    .heuristic(heuristic)
                    .pack_mode(mode)
                    .create("ui", images)
                    .unwrap();
                assert_eq!(atlas.len(), 12);
                assert_valid_layout(&atlas);
            }
        }
    }

    #[test]
    fn test_create_is_deterministic() {
        let make = || {
            (0..20)
                .map(|i| solid(&format!("s{}", i), 3 + (i * 7) % 17, 4 + (i * 5) % 13, 1))
                .collect::<Vec<_>>()
        };
        let builder = AtlasBuilder::new(256)
            .heuristic(PackingHeuristic::Best)
            .pack_mode(PackMode::Best);

        let a = builder.create("ui", make()).unwrap();
        let b = builder.create("ui", make()).unwrap();

        assert_eq!(frames(&a), frames(&b));
        assert_eq!(a.image(), b.image());
    }

    #[test]
    fn test_overflow_is_reported() {
        let images = vec![solid("a", 3, 3, 1), solid("b", 3, 3, 2)];
        let err = AtlasBuilder::new(4)
            .padding(0)
            .create("tiny", images)
            .unwrap_err();

        assert!(matches!(
            err,
            AtlasError::PackingOverflow { placed: 1, total: 2, max_dimension: 4, .. }
        ));
    }

    #[test]
    fn test_padding_counts_towards_footprint() {
        // 2 + 2 fits in 4 without a gap, but not with one
        let images = || vec![solid("a", 2, 4, 1), solid("b", 2, 4, 2)];
        assert!(AtlasBuilder::new(4).padding(0).create("t", images()).is_ok());
        assert!(matches!(
            AtlasBuilder::new(4).padding(1).create("t", images()),
            Err(AtlasError::PackingOverflow { .. })
        ));
    }

    #[test]
    fn test_huge_padding_overflows_instead_of_overlapping() {
        let images = || vec![solid("a", 3, 3, 1), solid("b", 3, 3, 2)];
        for padding in [u32::MAX, u32::MAX - 2, u32::MAX / 2] {
            let err = AtlasBuilder::new(64)
                .padding(padding)
                .create("p", images())
                .unwrap_err();
            assert!(matches!(err, AtlasError::PackingOverflow { total: 2, .. }));
        }

        let atlas = AtlasBuilder::new(64)
            .create("p", vec![solid("a", 8, 8, 1)])
            .unwrap();
        let err = AtlasBuilder::default()
            .merge(&atlas_with_padding(&atlas, u32::MAX), vec![solid("b", 3, 3, 2)], None)
            .unwrap_err();
        assert!(err.is_overflow());
    }

    fn atlas_with_padding(atlas: &Atlas, padding: u32) -> Atlas {
        Atlas::new(
            atlas.name(),
            atlas.max_dimension(),
            padding,
            atlas.image().clone(),
            atlas.sprites().to_vec(),
        )
    }

    #[test]
    fn test_sprite_larger_than_atlas() {
        let err = AtlasBuilder::new(16)
            .create("t", vec![solid("huge", 17, 2, 1)])
            .unwrap_err();
        assert!(matches!(err, AtlasError::SpriteTooLarge { width: 17, .. }));
        assert!(err.is_overflow());
    }

    #[test]
    fn test_create_rejects_bad_input() {
        assert!(matches!(
            AtlasBuilder::default().create("t", Vec::new()),
            Err(AtlasError::NoImages)
        ));
        assert!(matches!(
            AtlasBuilder::default().create("t", vec![solid("a", 2, 2, 1), solid("a", 3, 3, 1)]),
            Err(AtlasError::DuplicateName { name, .. }) if name == "a"
        ));
        assert!(matches!(
            AtlasBuilder::default().create("t", vec![SpriteImage::new("z", RgbaImage::new(0, 3))]),
            Err(AtlasError::EmptyImage { .. })
        ));
        assert!(matches!(
            AtlasBuilder::default().create("t", vec![solid("l", 2, 2, 1).locked()]),
            Err(AtlasError::NotReadable { .. })
        ));
    }

    #[test]
    fn test_bitmap_holds_sprite_pixels() {
        let mut striped = RgbaImage::new(4, 3);
        for (x, y, p) in striped.enumerate_pixels_mut() {
            *p = Rgba([x as u8 * 40, y as u8 * 60, 200, 128]);
        }
        let images = vec![solid("a", 5, 5, 90), SpriteImage::new("b", striped.clone())];
        let atlas = AtlasBuilder::new(64).create("ui", images).unwrap();

        let frame = atlas.sprite("b").unwrap().frame;
        let view = imageops::crop_imm(atlas.image(), frame.x, frame.y, frame.width, frame.height)
            .to_image();
        assert_eq!(view, striped);
    }

    #[test]
    fn test_bitmap_uses_power_of_two_extent() {
        let atlas = AtlasBuilder::new(1024)
            .padding(0)
            .create("ui", vec![solid("a", 30, 10, 1)])
            .unwrap();
        assert_eq!((atlas.width(), atlas.height()), (32, 16));

        let region = atlas.region("a").unwrap();
        assert_eq!(region.x, 0.0);
        assert!((region.width - 30.0 / 32.0).abs() < f32::EPSILON);
        assert!((region.height - 10.0 / 16.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bitmap_never_exceeds_max_dimension() {
        let atlas = AtlasBuilder::new(100)
            .padding(0)
            .create("ui", vec![solid("a", 70, 100, 1)])
            .unwrap();
        assert_eq!((atlas.width(), atlas.height()), (100, 100));
        assert_eq!(atlas.region("a").map(|r| r.height), Some(1.0));
    }

    #[test]
    fn test_border_defaults_to_zero() {
        let images = vec![
            solid("plain", 4, 4, 1),
            solid("framed", 8, 8, 1).with_border(BorderInset::new(1, 2, 3, 4)),
        ];
        let atlas = AtlasBuilder::new(64).create("ui", images).unwrap();
        assert!(atlas.sprite("plain").unwrap().border.is_zero());
        assert_eq!(
            atlas.sprite("framed").unwrap().border,
            BorderInset::new(1, 2, 3, 4)
        );
    }

    #[test]
    fn test_merge_nothing_keeps_sprites() {
        let atlas = AtlasBuilder::new(64)
            .create("ui", vec![solid("a", 8, 8, 10), solid("b", 6, 12, 20)])
            .unwrap();

        let merged = AtlasBuilder::new(64).merge(&atlas, Vec::new(), None).unwrap();

        assert_eq!(
            merged.sprite_names().collect::<Vec<_>>(),
            atlas.sprite_names().collect::<Vec<_>>()
        );
        for (old, new) in atlas.sprites().iter().zip(merged.sprites()) {
            assert_eq!(old.image, new.image);
        }
    }

    #[test]
    fn test_merge_round_trips_new_image() {
        let atlas = AtlasBuilder::new(64)
            .create("ui", vec![solid("a", 8, 8, 10)])
            .unwrap();
        let mut fresh = RgbaImage::new(5, 7);
        fresh.put_pixel(4, 6, Rgba([1, 2, 3, 4]));

        let merged = AtlasBuilder::default()
            .merge(&atlas, vec![SpriteImage::new("new", fresh.clone())], None)
            .unwrap();

        let found = merged.find_images(&["new"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].image, fresh);
        assert_eq!(merged.sprite_names().collect::<Vec<_>>(), ["a", "new"]);
        assert_valid_layout(&merged);
    }

    #[test]
    fn test_merge_keeps_atlas_limits() {
        let atlas = AtlasBuilder::new(16)
            .padding(1)
            .create("ui", vec![solid("a", 10, 10, 1)])
            .unwrap();

        // Builder limits do not apply to an existing atlas
        let err = AtlasBuilder::new(4096)
            .merge(&atlas, vec![solid("b", 10, 10, 2)], None)
            .unwrap_err();
        assert!(matches!(err, AtlasError::PackingOverflow { max_dimension: 16, .. }));

        // The source atlas is unchanged
        assert_eq!(atlas.len(), 1);
        assert_eq!(atlas.sprite_names().collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn test_merge_replace_carries_border_forward() {
        let atlas = AtlasBuilder::new(64)
            .create(
                "ui",
                vec![
                    solid("a", 8, 8, 10).with_border(BorderInset::uniform(2)),
                    solid("b", 8, 8, 20).with_border(BorderInset::uniform(3)),
                ],
            )
            .unwrap();

        let merged = AtlasBuilder::default()
            .merge(
                &atlas,
                vec![
                    solid("a", 4, 4, 99),
                    solid("b", 4, 4, 98).with_border(BorderInset::new(1, 0, 0, 0)),
                ],
                None,
            )
            .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.sprite_names().collect::<Vec<_>>(), ["a", "b"]);
        let a = merged.sprite("a").unwrap();
        assert_eq!(a.border, BorderInset::uniform(2));
        assert_eq!(a.image.get_pixel(0, 0), &Rgba([99, 49, 7, 255]));
        assert_eq!(
            merged.sprite("b").unwrap().border,
            BorderInset::new(1, 0, 0, 0)
        );
    }

    #[test]
    fn test_merge_reject_policy() {
        let atlas = AtlasBuilder::new(64)
            .create("ui", vec![solid("a", 8, 8, 10)])
            .unwrap();

        let err = AtlasBuilder::default()
            .on_conflict(NameConflict::Reject)
            .merge(&atlas, vec![solid("b", 2, 2, 1), solid("a", 2, 2, 1)], None)
            .unwrap_err();
        assert!(matches!(err, AtlasError::DuplicateName { name, .. } if name == "a"));
    }

    #[test]
    fn test_merge_rejects_duplicates_among_new_images() {
        let atlas = AtlasBuilder::new(64)
            .create("ui", vec![solid("a", 8, 8, 10)])
            .unwrap();
        let err = AtlasBuilder::default()
            .merge(&atlas, vec![solid("b", 2, 2, 1), solid("b", 3, 3, 1)], None)
            .unwrap_err();
        assert!(matches!(err, AtlasError::DuplicateName { name, .. } if name == "b"));
    }

    #[test]
    fn test_merge_locked_sprites_need_readback() {
        let base = AtlasBuilder::new(64)
            .create("ui", vec![solid("a", 8, 8, 10), solid("b", 4, 4, 20)])
            .unwrap();
        let locked = AtlasBuilder::default()
            .merge(&base, vec![solid("c", 4, 4, 30).locked()], Some(&BlitReadback))
            .unwrap();
        let locked = Atlas::new(
            locked.name(),
            locked.max_dimension(),
            locked.padding(),
            locked.image().clone(),
            locked
                .sprites()
                .iter()
                .cloned()
                .map(|mut s| {
                    s.readable = false;
                    s
                })
                .collect(),
        );

        let err = AtlasBuilder::default()
            .merge(&locked, Vec::new(), None)
            .unwrap_err();
        assert!(matches!(err, AtlasError::NotReadable { .. }));

        let merged = AtlasBuilder::default()
            .merge(&locked, vec![solid("d", 2, 2, 40)], Some(&BlitReadback))
            .unwrap();
        assert_eq!(merged.len(), 4);
        for name in ["a", "b", "c"] {
            let sprite = merged.sprite(name).unwrap();
            assert_eq!(sprite.image, locked.sprite(name).unwrap().image);
            assert!(sprite.readable);
        }
    }

    #[test]
    fn test_merge_readback_is_used_for_every_existing_sprite() {
        use std::cell::RefCell;

        let atlas = AtlasBuilder::new(64)
            .create("ui", vec![solid("a", 8, 8, 10), solid("b", 4, 4, 20)])
            .unwrap();
        let seen = RefCell::new(Vec::new());
        let recording = |name: &str, img: &RgbaImage| -> Result<RgbaImage> {
            seen.borrow_mut().push(name.to_string());
            Ok(img.clone())
        };

        AtlasBuilder::default()
            .merge(&atlas, vec![solid("b", 2, 2, 1), solid("c", 2, 2, 1)], Some(&recording))
            .unwrap();

        // "b" is replaced so only "a" needs reading back
        assert_eq!(*seen.borrow(), ["a"]);
    }

    #[test]
    fn test_merge_readback_failure_propagates() {
        let atlas = AtlasBuilder::new(64)
            .create("ui", vec![solid("a", 8, 8, 10)])
            .unwrap();
        let failing = |name: &str, _: &RgbaImage| -> Result<RgbaImage> {
            Err(AtlasError::Readback {
                name: name.to_string(),
                message: "device lost".to_string(),
            })
        };

        let err = AtlasBuilder::default()
            .merge(&atlas, Vec::new(), Some(&failing))
            .unwrap_err();
        assert!(matches!(err, AtlasError::Readback { .. }));
    }

    #[test]
    fn test_merge_into_empty_atlas() {
        let empty = Atlas::empty("fresh", 32, 0);
        let merged = AtlasBuilder::default()
            .merge(&empty, vec![solid("a", 4, 4, 1)], None)
            .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.max_dimension(), 32);

        let still_empty = AtlasBuilder::default()
            .merge(&empty, Vec::new(), None)
            .unwrap();
        assert!(still_empty.is_empty());
    }

    #[test]
    fn test_bitmap_side() {
        assert_eq!(bitmap_side(0, 1024), 1);
        assert_eq!(bitmap_side(1, 1024), 1);
        assert_eq!(bitmap_side(3, 1024), 4);
        assert_eq!(bitmap_side(100, 1024), 128);
        assert_eq!(bitmap_side(1000, 1024), 1024);
        assert_eq!(bitmap_side(90, 100), 100);
    }
}
