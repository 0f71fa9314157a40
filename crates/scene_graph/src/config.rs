//! Configuration types and file loading
//!
//! Traversal and camera parameters are plain serde structs loadable from
//! TOML or RON, with validation separated from the per-frame hot path:
//! configuration is checked once at load time, never per frame.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::node::Projection;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML syntax or schema error
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// RON syntax or schema error
    #[error("ron parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// The file extension does not name a supported format
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A value failed validation
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Traversal and subdivision tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Direct children a group may hold before subdivision is triggered
    pub split_threshold: usize,

    /// When a split attempt collapses into a single octant, double the
    /// group's effective threshold instead of leaving an oversized group
    /// that will be re-attempted every frame
    pub raise_threshold_on_degenerate_split: bool,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            split_threshold: 64,
            raise_threshold_on_degenerate_split: true,
        }
    }
}

impl TraversalConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.split_threshold < 2 {
            return Err(ConfigError::Invalid(format!(
                "split_threshold must be at least 2, got {}",
                self.split_threshold
            )));
        }
        Ok(())
    }
}

/// Orthographic clip bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrthographicBounds {
    /// Left clip bound
    pub left: f32,
    /// Right clip bound
    pub right: f32,
    /// Bottom clip bound
    pub bottom: f32,
    /// Top clip bound
    pub top: f32,
}

/// Camera projection parameters
///
/// `orthographic` switches the camera to an orthographic projection using
/// the given bounds; otherwise the perspective fields apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees (perspective)
    pub fov_degrees: f32,

    /// Viewport aspect ratio (width / height)
    pub aspect: f32,

    /// Near clip distance
    pub near: f32,

    /// Far clip distance
    pub far: f32,

    /// Orthographic bounds; `None` selects perspective projection
    pub orthographic: Option<OrthographicBounds>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            orthographic: None,
        }
    }
}

impl CameraConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.far <= self.near {
            return Err(ConfigError::Invalid(format!(
                "far plane ({}) must exceed near plane ({})",
                self.far, self.near
            )));
        }
        if self.orthographic.is_none() {
            if self.near <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "perspective near plane must be positive, got {}",
                    self.near
                )));
            }
            if !(0.0..180.0).contains(&self.fov_degrees) || self.fov_degrees == 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "field of view must be in (0, 180) degrees, got {}",
                    self.fov_degrees
                )));
            }
        }
        Ok(())
    }

    /// Build the runtime projection for a camera node
    pub fn to_projection(&self) -> Projection {
        match self.orthographic {
            Some(bounds) => Projection::Orthographic {
                left: bounds.left,
                right: bounds.right,
                bottom: bounds.bottom,
                top: bounds.top,
                near: self.near,
                far: self.far,
            },
            None => Projection::Perspective {
                fov_y: crate::foundation::math::utils::deg_to_rad(self.fov_degrees),
                aspect: self.aspect,
                near: self.near,
                far: self.far,
            },
        }
    }
}

/// Top-level configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Traversal and subdivision tuning
    pub traversal: TraversalConfig,

    /// Camera projection parameters
    pub camera: CameraConfig,
}

impl SceneConfig {
    /// Load from a TOML or RON file, selected by extension
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let config = match extension {
            "toml" => Self::from_toml_str(&contents)?,
            "ron" => Self::from_ron_str(&contents)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        log::info!("loaded scene config from {}", path.display());
        Ok(config)
    }

    /// Parse from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from a RON string
    pub fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.traversal.validate()?;
        self.camera.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SceneConfig::default().validate().is_ok());
        assert_eq!(TraversalConfig::default().split_threshold, 64);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_src = r#"
            [traversal]
            split_threshold = 16
            raise_threshold_on_degenerate_split = false

            [camera]
            fov_degrees = 60.0
            aspect = 1.5
            near = 0.5
            far = 250.0
        "#;
        let config = SceneConfig::from_toml_str(toml_src).unwrap();
        assert_eq!(config.traversal.split_threshold, 16);
        assert!(!config.traversal.raise_threshold_on_degenerate_split);
        assert!(matches!(
            config.camera.to_projection(),
            Projection::Perspective { .. }
        ));
    }

    #[test]
    fn test_ron_orthographic_camera() {
        let ron_src = r#"(
            traversal: (
                split_threshold: 32,
                raise_threshold_on_degenerate_split: true,
            ),
            camera: (
                fov_degrees: 45.0,
                aspect: 1.0,
                near: 0.1,
                far: 100.0,
                orthographic: Some((left: -10.0, right: 10.0, bottom: -10.0, top: 10.0)),
            ),
        )"#;
        let config = SceneConfig::from_ron_str(ron_src).unwrap();
        assert!(matches!(
            config.camera.to_projection(),
            Projection::Orthographic { .. }
        ));
    }

    #[test]
    fn test_validation_rejects_inverted_clip_planes() {
        let config = SceneConfig {
            camera: CameraConfig {
                near: 10.0,
                far: 1.0,
                ..CameraConfig::default()
            },
            ..SceneConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validation_rejects_tiny_split_threshold() {
        let config = TraversalConfig {
            split_threshold: 1,
            raise_threshold_on_degenerate_split: true,
        };
        assert!(config.validate().is_err());
    }
}
