pub mod atlas;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod packing;
pub mod resource;
pub mod sprite;

pub use atlas::{Atlas, AtlasBuilder, AtlasRegistry, AtlasSprite, NameConflict, PackedRegion};
pub use error::AtlasError;
pub use resource::{DirectoryResources, EmbeddedResources, ResourceProvider};
pub use sprite::{BlitReadback, BorderInset, Readback, SpriteImage};
