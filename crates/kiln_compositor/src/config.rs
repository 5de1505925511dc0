//! Compositor configuration (kiln.toml)

use std::fs;
use std::path::Path;

use kiln_core::{Color, ISize};
use kiln_renderer::{CompletionDelivery, RendererConfig};
use serde::{Deserialize, Serialize};

use crate::error::{CompositorError, Result};

/// Top-level configuration
///
/// ```toml
/// [renderer]
/// sample_count = 4
///
/// [frame]
/// width = 800
/// height = 600
/// delivery = "deferred"
/// clear_color = { r = 0.0, g = 0.0, b = 0.0, a = 1.0 }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CompositorConfig {
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub frame: FrameConfig,
}

/// Per-frame settings
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FrameConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// When the headless backend fires completion callbacks
    #[serde(default)]
    pub delivery: CompletionDelivery,
    /// Color the frame target is cleared to before compositing
    #[serde(default = "default_clear_color")]
    pub clear_color: Color,
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_clear_color() -> Color {
    Color::TRANSPARENT
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            delivery: CompletionDelivery::default(),
            clear_color: default_clear_color(),
        }
    }
}

impl FrameConfig {
    pub fn size(&self) -> ISize {
        ISize::new(self.width, self.height)
    }
}

impl CompositorConfig {
    /// Load from a file, then apply `KILN_*` environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| CompositorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.renderer = config.renderer.with_env_overrides();
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| CompositorError::Serialize(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CompositorConfig::from_toml_str("").unwrap();
        assert_eq!(config.frame, FrameConfig::default());
        assert_eq!(config.renderer.sample_count, RendererConfig::default().sample_count);
    }

    #[test]
    fn test_partial_sections() {
        let config = CompositorConfig::from_toml_str(
            r#"
            [renderer]
            stencil_then_cover = false

            [frame]
            width = 64
            delivery = "deferred"
            "#,
        )
        .unwrap();
        assert!(!config.renderer.stencil_then_cover);
        assert_eq!(config.frame.size(), ISize::new(64, 600));
        assert_eq!(config.frame.delivery, CompletionDelivery::Deferred);
    }

    #[test]
    fn test_bad_toml_is_a_parse_error() {
        let err = CompositorConfig::from_toml_str("[frame\nwidth = 1").unwrap_err();
        assert!(matches!(err, CompositorError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = CompositorConfig::load(Path::new("/nonexistent/kiln.toml")).unwrap_err();
        assert!(matches!(err, CompositorError::Io { .. }));
    }

    #[test]
    fn test_toml_output_reloads() {
        let mut config = CompositorConfig::default();
        config.frame.clear_color = Color::BLUE;
        let text = config.to_toml_string().unwrap();
        let reloaded: CompositorConfig = toml::from_str(&text).unwrap();
        assert_eq!(reloaded.frame.clear_color, Color::BLUE);
    }
}
