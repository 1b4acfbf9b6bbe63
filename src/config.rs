//! Engine configuration, loaded from TOML. Every field has a default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use tag_store::{PresetColor, TagColor};

use crate::propagation::CascadeScope;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TagTreeConfig {
    /// Rows per page of the linearized tree
    pub page_size: usize,
    pub cascade: CascadeScope,
    /// Color for tags with no color of their own
    pub default_color: TagColor,
    /// Capacity of the bus broadcast stream
    pub bus_capacity: usize,
    /// Show children of matching parents while a search is active
    pub expand_on_search: bool,
}

impl Default for TagTreeConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            cascade: CascadeScope::DirectChildren,
            default_color: TagColor::Preset(PresetColor::Gray),
            bus_capacity: 256,
            expand_on_search: true,
        }
    }
}

impl TagTreeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let mut config: TagTreeConfig = toml::from_str(s)?;
        config.page_size = config.page_size.max(1);
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(TagTreeConfig::from_toml_str("").unwrap(), TagTreeConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = TagTreeConfig::from_toml_str(
            r##"
page-size = 20
cascade = "subtree"
default-color = "#112233"
"##,
        )
        .unwrap();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.cascade, CascadeScope::Subtree);
        assert_eq!(config.default_color, TagColor::Hex("#112233".into()));
        assert!(config.expand_on_search);
    }

    #[test]
    fn test_zero_page_size_clamped() {
        let config = TagTreeConfig::from_toml_str("page-size = 0").unwrap();
        assert_eq!(config.page_size, 1);
    }

    #[test]
    fn test_bad_color_rejected() {
        assert!(matches!(
            TagTreeConfig::from_toml_str("default-color = \"plaid\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tag-tree.toml");
        std::fs::write(&path, "bus-capacity = 16\n").unwrap();
        assert_eq!(TagTreeConfig::load(&path).unwrap().bus_capacity, 16);

        let missing = TagTreeConfig::load(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
