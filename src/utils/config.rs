//! Playground configuration (JSON), with every field defaulted.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::errors::ConfigError;
use crate::utils::image_loader::ImageSource;
use crate::utils::palette::PaletteConfig;
use crate::utils::shader_constants::{DEFAULT_FONT_SIZE, MAX_FONT_SIZE, MIN_FONT_SIZE};

/// Directory name under the platform config/data dirs.
pub const APP_DIR: &str = "glsl-palette-playground";

/// Location used when nothing was stored and no `--url` was given.
pub const DEFAULT_BASE_URL: &str = "glsl-playground://session/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin + path + query that share links are built on.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub image: ImageSource,
    #[serde(default)]
    pub palette: PaletteConfig,
    #[serde(default = "default_font_size")]
    pub editor_font_size: f32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            image: ImageSource::default(),
            palette: PaletteConfig::default(),
            editor_font_size: default_font_size(),
        }
    }
}

impl AppConfig {
    /// `<config_dir>/glsl-palette-playground/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.json"))
    }

    pub fn from_json(json_str: &str, origin: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json_str).map_err(|source| ConfigError::Json {
            path: origin.to_string(),
            source,
        })?;
        config.editor_font_size = config.editor_font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&raw, &display)
    }

    /// Explicit path must load; the default path is optional.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::info!("Loading config from {}", path.display());
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                log::info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => {
                log::debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = AppConfig::from_json("{}", "test").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.image, ImageSource::Demo);
    }

    #[test]
    fn test_full_config() {
        let json = r#"{
            "base_url": "https://example.org/playground/?dataset=7",
            "image": { "kind": "channels", "locations": ["dapi.png", "https://example.org/cd4.png"] },
            "palette": {
                "colors": [[255, 0, 0], [0, 0, 255]],
                "opacity": 0.5,
                "transparent_color": [0, 0, 0],
                "use_transparent_color": true,
                "channels_visible": [true, false]
            },
            "editor_font_size": 99.0
        }"#;
        let config = AppConfig::from_json(json, "test").unwrap();
        assert_eq!(config.base_url, "https://example.org/playground/?dataset=7");
        assert_eq!(
            config.image,
            ImageSource::Channels {
                locations: vec!["dapi.png".to_string(), "https://example.org/cd4.png".to_string()]
            }
        );
        assert_eq!(config.palette.colors.len(), 2);
        assert_eq!(config.palette.transparent_color, Some([0, 0, 0]));
        assert_eq!(config.editor_font_size, MAX_FONT_SIZE);
    }

    #[test]
    fn test_invalid_json_names_origin() {
        let err = AppConfig::from_json("{ nope", "broken.json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
