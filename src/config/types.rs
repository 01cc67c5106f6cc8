use serde::{Deserialize, Serialize};

use crate::atlas::{DEFAULT_MAX_DIMENSION, DEFAULT_PADDING, NameConflict};
use crate::packing::{PackMode, PackingHeuristic};

/// PNG compression level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompressConfig {
    /// Optimization level 0-6
    Level(u8),
    /// Maximum compression ("max")
    Max(String),
}

/// Atlas configuration file structure.
///
/// All paths in the config are relative to the config file location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Config file version (currently 1)
    pub version: u32,
    /// Atlas name, also the base name of the output files
    pub name: String,
    /// Input file paths or glob patterns
    pub input: Vec<String>,
    /// Output directory for atlas files
    pub output_dir: String,
    /// Maximum atlas side in pixels
    pub max_dimension: u32,
    /// Gap between sprites in pixels
    pub padding: u32,
    pub heuristic: PackingHeuristic,
    pub pack_mode: PackMode,
    /// What merging does with a sprite name that already exists
    pub on_conflict: NameConflict,
    /// PNG compression configuration (optional)
    pub compress: Option<CompressConfig>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            version: 1,
            name: "atlas".to_string(),
            input: Vec::new(),
            output_dir: ".".to_string(),
            max_dimension: DEFAULT_MAX_DIMENSION,
            padding: DEFAULT_PADDING,
            heuristic: PackingHeuristic::default(),
            pack_mode: PackMode::default(),
            on_conflict: NameConflict::default(),
            compress: None,
        }
    }
}
