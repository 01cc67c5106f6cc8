mod builder;
mod registry;
mod types;

pub use builder::{AtlasBuilder, DEFAULT_MAX_DIMENSION, DEFAULT_PADDING, NameConflict};
pub use registry::AtlasRegistry;
pub use types::{Atlas, AtlasSprite, PackedRegion};
