use std::path::Path;

use anyhow::{Context, Result};

use super::types::AtlasConfig;

/// Save a config to a JSON file with pretty formatting.
pub fn save_config(config: &AtlasConfig, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(config)
        .with_context(|| "failed to serialize config to JSON")?;

    std::fs::write(path, content)
        .with_context(|| format!("failed to write config file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadedConfig;

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("atlaspack-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("atlas.json");

        let config = AtlasConfig {
            name: "hud".to_string(),
            input: vec!["sprites/*.png".to_string()],
            padding: 4,
            ..AtlasConfig::default()
        };
        save_config(&config, &path).unwrap();

        let loaded = LoadedConfig::load(&path).unwrap();
        assert_eq!(loaded.config.name, "hud");
        assert_eq!(loaded.config.padding, 4);
        assert_eq!(loaded.config_dir, dir);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
