mod loader;
mod provider;

pub use loader::{
    SUPPORTED_EXTENSIONS, decode_image, is_supported_image, load_files, load_image, load_sprites,
    sprite_name_for,
};
pub use provider::{DirectoryResources, EmbeddedResources, ResourceProvider};
