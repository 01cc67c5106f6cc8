use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::atlas::NameConflict;
use crate::packing::{PackMode, PackingHeuristic};

#[derive(Parser, Debug)]
#[command(name = "atlaspack")]
#[command(version, about = "Sprite atlas packer", long_about = None)]
pub struct CliArgs {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Pack images into a new atlas (PNG + JSON)
    Pack(PackArgs),
    /// Add images to an existing atlas, re-packing every sprite
    Merge(MergeArgs),
    /// Write a config file with default settings
    Init {
        /// Path of the config file to create
        #[arg(default_value = "atlas.json")]
        path: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PackArgs {
    /// Input image files or directories
    #[arg(required_unless_present = "config")]
    pub input: Vec<PathBuf>,

    /// Load settings from a config file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Atlas name, also used as the output base name [default: atlas]
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Maximum atlas side in pixels [default: 1024]
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Padding between sprites in pixels [default: 2]
    #[arg(short, long)]
    pub padding: Option<u32>,

    /// Packing heuristic to use [default: best-short-side-fit]
    #[arg(long, value_enum)]
    pub heuristic: Option<PackingHeuristic>,

    /// Pack mode: single (input order) or best (try multiple orderings) [default: single]
    #[arg(long, value_enum)]
    pub pack_mode: Option<PackMode>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    /// JSON metadata of the atlas to extend
    pub atlas: PathBuf,

    /// Images or directories to add
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Take packing settings from a config file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Copy existing sprites through the readback path before packing
    #[arg(long)]
    pub readback: bool,

    /// What to do when an added image has the name of an existing sprite [default: replace]
    #[arg(long, value_enum)]
    pub on_conflict: Option<NameConflict>,

    /// Packing heuristic to use [default: best-short-side-fit]
    #[arg(long, value_enum)]
    pub heuristic: Option<PackingHeuristic>,

    /// Pack mode: single (input order) or best (try multiple orderings) [default: single]
    #[arg(long, value_enum)]
    pub pack_mode: Option<PackMode>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output directory for atlas files [default: .]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compress PNG output (0-6 or 'max'). Default level is 2 if flag is present without value.
    #[arg(long, value_name = "LEVEL", default_missing_value = "2", num_args = 0..=1)]
    pub compress: Option<CompressionLevel>,
}

/// PNG compression level (0-6 or max)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Optimization level 0-6
    Level(u8),
    /// Maximum compression
    Max,
}

impl std::str::FromStr for CompressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("max") {
            Ok(CompressionLevel::Max)
        } else {
            s.parse::<u8>()
                .map_err(|_e| format!("invalid compression level: {}", s))
                .and_then(|n| {
                    if n <= 6 {
                        Ok(CompressionLevel::Level(n))
                    } else {
                        Err(format!("compression level must be 0-6 or 'max', got {}", n))
                    }
                })
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        CompressionLevel::Level(2)
    }
}
