mod format;
mod json;

pub use format::{load_atlas_image, save_atlas_image};
pub use json::{load_atlas, write_json};

/// File name of the atlas bitmap for a given output base name
pub fn atlas_png_filename(base_name: &str) -> String {
    format!("{}.png", base_name)
}
