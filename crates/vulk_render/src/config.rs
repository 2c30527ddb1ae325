//! Renderer settings loaded from TOML

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::render::context::{VulkanError, VulkanResult};
use crate::render::frame::MAX_FRAMES_IN_FLIGHT;

/// Settings controlling where assets live and how the samples render
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Root directory for textures and models
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,

    /// Root directory for compiled SPIR-V shaders
    #[serde(default = "default_shader_root")]
    pub shader_root: PathBuf,

    /// Initial window width hint
    #[serde(default = "default_window_width")]
    pub window_width: u32,

    /// Initial window height hint
    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Frames the CPU may record ahead; must match the renderer's constant
    #[serde(default = "default_frames_in_flight")]
    pub max_frames_in_flight: usize,

    /// Enable Vulkan validation layers in the host shell
    #[serde(default)]
    pub enable_validation: bool,
}

fn default_asset_root() -> PathBuf {
    PathBuf::from("assets")
}

fn default_shader_root() -> PathBuf {
    PathBuf::from("assets/shaders")
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

fn default_frames_in_flight() -> usize {
    MAX_FRAMES_IN_FLIGHT
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            asset_root: default_asset_root(),
            shader_root: default_shader_root(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            max_frames_in_flight: default_frames_in_flight(),
            enable_validation: false,
        }
    }
}

impl RenderSettings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(s: &str) -> VulkanResult<Self> {
        let settings: Self = toml::from_str(s).map_err(|e| VulkanError::Config {
            reason: format!("failed to parse settings: {}", e),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> VulkanResult<Self> {
        let contents = std::fs::read_to_string(&path).map_err(|e| VulkanError::Config {
            reason: format!(
                "failed to read settings file {}: {}",
                path.as_ref().display(),
                e
            ),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check the settings are usable
    pub fn validate(&self) -> VulkanResult<()> {
        if self.max_frames_in_flight != MAX_FRAMES_IN_FLIGHT {
            return Err(VulkanError::Config {
                reason: format!(
                    "max_frames_in_flight is {}, renderer is built for {}",
                    self.max_frames_in_flight, MAX_FRAMES_IN_FLIGHT
                ),
            });
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(VulkanError::Config {
                reason: "window extent must be nonzero".to_string(),
            });
        }
        Ok(())
    }

    /// Path to a compiled SPIR-V shader by file name
    pub fn shader_path(&self, name: &str) -> PathBuf {
        self.shader_root.join(name)
    }

    /// Path to a texture under the asset root
    pub fn texture_path(&self, name: &str) -> PathBuf {
        self.asset_root.join("textures").join(name)
    }

    /// Path to a model under the asset root
    pub fn model_path(&self, name: &str) -> PathBuf {
        self.asset_root.join("models").join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = RenderSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_frames_in_flight, MAX_FRAMES_IN_FLIGHT);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let settings = RenderSettings::from_toml_str(
            r#"
            shader_root = "build/shaders"
            window_width = 1920
            window_height = 1080
            "#,
        )
        .unwrap();

        assert_eq!(settings.shader_root, PathBuf::from("build/shaders"));
        assert_eq!(settings.window_width, 1920);
        assert_eq!(settings.asset_root, PathBuf::from("assets"));
        assert!(!settings.enable_validation);
    }

    #[test]
    fn rejects_mismatched_frames_in_flight() {
        let result = RenderSettings::from_toml_str("max_frames_in_flight = 3");
        assert!(matches!(result, Err(VulkanError::Config { .. })));
    }

    #[test]
    fn rejects_zero_extent() {
        let result = RenderSettings::from_toml_str("window_width = 0");
        assert!(matches!(result, Err(VulkanError::Config { .. })));
    }

    #[test]
    fn shader_path_joins_root() {
        let settings = RenderSettings::default();
        assert_eq!(
            settings.shader_path("LitModel.vert.spv"),
            PathBuf::from("assets/shaders/LitModel.vert.spv")
        );
    }
}
