use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use atlaspack::atlas::{Atlas, AtlasBuilder, DEFAULT_MAX_DIMENSION, DEFAULT_PADDING, NameConflict};
use atlaspack::cli::{CliArgs, Command, CompressionLevel, MergeArgs, OutputArgs, PackArgs};
use atlaspack::config::{AtlasConfig, CompressConfig, LoadedConfig, save_config};
use atlaspack::output::{atlas_png_filename, load_atlas, save_atlas_image, write_json};
use atlaspack::packing::{PackMode, PackingHeuristic};
use atlaspack::resource::load_files;
use atlaspack::sprite::{BlitReadback, Readback};

#[allow(clippy::print_stderr)]
fn main() {
    if let Err(e) = run() {
        // Logger may not be initialized yet
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = CliArgs::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    info!("atlaspack v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Command::Pack(args) => pack(args),
        Command::Merge(args) => merge(args),
        Command::Init { path } => {
            save_config(&AtlasConfig::default(), path)?;
            info!("Wrote default config to {}", path.display());
            Ok(())
        }
    }
}

fn pack(args: &PackArgs) -> Result<()> {
    let merged = merge_config_with_args(args)?;

    let base_dir = merged.base_dir.as_deref();
    let sprites = load_files(&merged.input, base_dir).context("failed to load input images")?;
    info!("Loaded {} sprites", sprites.len());

    let atlas = AtlasBuilder::new(merged.max_dimension)
        .padding(merged.padding)
        .heuristic(merged.heuristic)
        .pack_mode(merged.pack_mode)
        .create(&merged.name, sprites)?;

    write_outputs(&atlas, &merged.output, &merged.name, merged.compress)
}

fn merge(args: &MergeArgs) -> Result<()> {
    let atlas = load_atlas(&args.atlas)
        .with_context(|| format!("failed to load atlas: {}", args.atlas.display()))?;
    info!("Loaded atlas '{}' with {} sprites", atlas.name(), atlas.len());

    let new_sprites = load_files(&args.input, None).context("failed to load input images")?;

    let loaded_config = args
        .config
        .as_deref()
        .map(|path| {
            LoadedConfig::load(path)
                .with_context(|| format!("failed to load config: {}", path.display()))
        })
        .transpose()?;
    let settings = merge_settings(args, loaded_config.as_ref().map(|lc| &lc.config))?;

    // Size limits always come from the atlas being extended
    let builder = AtlasBuilder::new(atlas.max_dimension())
        .padding(atlas.padding())
        .heuristic(settings.heuristic)
        .pack_mode(settings.pack_mode)
        .on_conflict(settings.on_conflict);

    let readback: Option<&dyn Readback> = if args.readback {
        Some(&BlitReadback)
    } else {
        None
    };
    let merged = builder.merge(&atlas, new_sprites, readback)?;

    let base_name = args
        .atlas
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(merged.name())
        .to_string();
    let output = output_dir(&args.output, || {
        args.atlas
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    write_outputs(&merged, &output, &base_name, settings.compress)
}

/// Packing settings for a merge, CLI first, then config, then defaults
#[derive(Debug, PartialEq)]
struct MergeSettings {
    heuristic: PackingHeuristic,
    pack_mode: PackMode,
    on_conflict: NameConflict,
    compress: Option<CompressionLevel>,
}

fn merge_settings(args: &MergeArgs, config: Option<&AtlasConfig>) -> Result<MergeSettings> {
    let heuristic = args
        .heuristic
        .or_else(|| config.map(|c| c.heuristic))
        .unwrap_or_default();

    let pack_mode = args
        .pack_mode
        .or_else(|| config.map(|c| c.pack_mode))
        .unwrap_or_default();

    let on_conflict = args
        .on_conflict
        .or_else(|| config.map(|c| c.on_conflict))
        .unwrap_or_default();

    let compress = if args.output.compress.is_some() {
        args.output.compress
    } else {
        config
            .and_then(|c| c.compress.as_ref())
            .map(compression_from_config)
            .transpose()?
    };

    Ok(MergeSettings {
        heuristic,
        pack_mode,
        on_conflict,
        compress,
    })
}

fn write_outputs(
    atlas: &Atlas,
    output: &Path,
    base_name: &str,
    compress: Option<CompressionLevel>,
) -> Result<()> {
    if !output.exists() {
        fs::create_dir_all(output)
            .with_context(|| format!("failed to create output dir: {}", output.display()))?;
    }

    let png_path = output.join(atlas_png_filename(base_name));
    save_atlas_image(atlas, &png_path, compress)?;
    info!("Saved {}", png_path.display());

    let json_path = write_json(atlas, output, base_name)?;
    info!("Generated {}", json_path.display());

    info!("Done!");
    Ok(())
}

fn output_dir(args: &OutputArgs, fallback: impl FnOnce() -> PathBuf) -> PathBuf {
    args.output.clone().unwrap_or_else(fallback)
}

/// Merged configuration from CLI args and optional config file.
struct MergedConfig {
    input: Vec<PathBuf>,
    /// Directory individual input files are named relative to
    base_dir: Option<PathBuf>,
    output: PathBuf,
    name: String,
    max_dimension: u32,
    padding: u32,
    heuristic: PackingHeuristic,
    pack_mode: PackMode,
    compress: Option<CompressionLevel>,
}

/// Merge config file values with CLI arguments.
/// CLI arguments always take precedence over config values.
fn merge_config_with_args(args: &PackArgs) -> Result<MergedConfig> {
    let loaded_config = if let Some(config_path) = &args.config {
        Some(
            LoadedConfig::load(config_path)
                .with_context(|| format!("failed to load config: {}", config_path.display()))?,
        )
    } else {
        None
    };

    let (input, base_dir) = if !args.input.is_empty() {
        (args.input.clone(), None)
    } else if let Some(ref lc) = loaded_config {
        let inputs = lc
            .resolve_inputs()
            .context("failed to resolve input files from config")?;
        (inputs, Some(lc.config_dir.clone()))
    } else {
        // Unreachable through clap's required_unless_present
        (Vec::new(), None)
    };

    let config = loaded_config.as_ref().map(|lc| &lc.config);

    let output = output_dir(&args.output, || {
        loaded_config
            .as_ref()
            .map(|lc| lc.resolve_output_dir())
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let name = args
        .name
        .clone()
        .or_else(|| config.map(|c| c.name.clone()))
        .unwrap_or_else(|| "atlas".to_string());

    let max_dimension = args
        .max_dimension
        .or_else(|| config.map(|c| c.max_dimension))
        .unwrap_or(DEFAULT_MAX_DIMENSION);

    let padding = args
        .padding
        .or_else(|| config.map(|c| c.padding))
        .unwrap_or(DEFAULT_PADDING);

    let heuristic = args
        .heuristic
        .or_else(|| config.map(|c| c.heuristic))
        .unwrap_or_default();

    let pack_mode = args
        .pack_mode
        .or_else(|| config.map(|c| c.pack_mode))
        .unwrap_or_default();

    let compress = if args.output.compress.is_some() {
        args.output.compress
    } else {
        config
            .and_then(|c| c.compress.as_ref())
            .map(compression_from_config)
            .transpose()?
    };

    Ok(MergedConfig {
        input,
        base_dir,
        output,
        name,
        max_dimension,
        padding,
        heuristic,
        pack_mode,
        compress,
    })
}

fn compression_from_config(compress: &CompressConfig) -> Result<CompressionLevel> {
    match compress {
        CompressConfig::Level(n) if *n <= 6 => Ok(CompressionLevel::Level(*n)),
        CompressConfig::Level(n) => {
            anyhow::bail!("compression level must be 0-6 or 'max', got {}", n)
        }
        CompressConfig::Max(s) if s.eq_ignore_ascii_case("max") => Ok(CompressionLevel::Max),
        CompressConfig::Max(s) => anyhow::bail!("unknown compression '{}' in config file", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge_args(extra: &[&str]) -> MergeArgs {
        let argv = ["atlaspack", "merge", "ui.json", "a.png"]
            .into_iter()
            .chain(extra.iter().copied());
        match CliArgs::try_parse_from(argv).unwrap().command {
            Command::Merge(args) => args,
            other => panic!("expected merge command, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_settings_default_without_config() {
        let settings = merge_settings(&merge_args(&[]), None).unwrap();
        assert_eq!(
            settings,
            MergeSettings {
                heuristic: PackingHeuristic::default(),
                pack_mode: PackMode::default(),
                on_conflict: NameConflict::Replace,
                compress: None,
            }
        );
    }

    #[test]
    fn test_merge_settings_read_config() {
        let config = AtlasConfig {
            heuristic: PackingHeuristic::ContactPoint,
            pack_mode: PackMode::Best,
            on_conflict: NameConflict::Reject,
            compress: Some(CompressConfig::Level(4)),
            ..AtlasConfig::default()
        };

        let settings = merge_settings(&merge_args(&[]), Some(&config)).unwrap();
        assert_eq!(settings.heuristic, PackingHeuristic::ContactPoint);
        assert_eq!(settings.pack_mode, PackMode::Best);
        assert_eq!(settings.on_conflict, NameConflict::Reject);
        assert_eq!(settings.compress, Some(CompressionLevel::Level(4)));
    }

    #[test]
    fn test_merge_settings_cli_overrides_config() {
        let config = AtlasConfig {
            pack_mode: PackMode::Best,
            on_conflict: NameConflict::Reject,
            ..AtlasConfig::default()
        };
        let args = merge_args(&["--on-conflict", "replace", "--compress", "max"]);

        let settings = merge_settings(&args, Some(&config)).unwrap();
        assert_eq!(settings.on_conflict, NameConflict::Replace);
        assert_eq!(settings.pack_mode, PackMode::Best);
        assert_eq!(settings.compress, Some(CompressionLevel::Max));
    }
}
