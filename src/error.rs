use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error(
        "Atlas '{atlas}' overflows {max_dimension}x{max_dimension}: only {placed} of {total} sprites fit"
    )]
    PackingOverflow {
        atlas: String,
        placed: usize,
        total: usize,
        max_dimension: u32,
    },

    #[error(
        "Sprite '{name}' ({width}x{height}) exceeds maximum atlas size ({max_dimension}x{max_dimension})"
    )]
    SpriteTooLarge {
        name: String,
        width: u32,
        height: u32,
        max_dimension: u32,
    },

    #[error("Sprite name '{name}' is used more than once in atlas '{atlas}'")]
    DuplicateName { atlas: String, name: String },

    #[error("Sprite '{name}' has no pixels")]
    EmptyImage { name: String },

    #[error("No images to pack")]
    NoImages,

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Failed to read resource '{path}': {source}")]
    ResourceRead {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to decode image '{path}': {source}")]
    Decode {
        path: String,
        source: image::ImageError,
    },

    #[error("Pixels of sprite '{name}' are not directly readable; enable readback")]
    NotReadable { name: String },

    #[error("Readback of sprite '{name}' failed: {message}")]
    Readback { name: String, message: String },

    #[error("Failed to save image '{path}': {source}")]
    ImageSave {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to load atlas image '{path}': {source}")]
    ImageLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to compress PNG '{path}': {message}")]
    PngCompress { path: PathBuf, message: String },

    #[error("Failed to read atlas metadata '{path}': {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse atlas metadata '{path}': {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Sprite '{name}' frame lies outside the atlas image '{path}'")]
    FrameOutOfBounds { path: PathBuf, name: String },
}

impl AtlasError {
    /// True when sprites did not fit the atlas, whether as a whole set or
    /// because a single sprite is larger than the atlas
    pub fn is_overflow(&self) -> bool {
        matches!(
            self,
            AtlasError::PackingOverflow { .. } | AtlasError::SpriteTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
