use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

use crate::content::Color;
use crate::math::Ellipsoid;

#[derive(Debug, Clone)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceConfig validation failed: {}", self.message)
    }
}

impl Error for ConfigError {}

fn default_maximum_texture_image_units() -> usize {
    16
}

fn default_base_color() -> [f32; 4] {
    [0.0, 0.0, 0.5, 1.0]
}

fn default_radii() -> [f64; 3] {
    let radii = Ellipsoid::WGS84.radii;
    [radii.x, radii.y, radii.z]
}

/// Settings for the quadtree surface tile provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Daytime textures sampled by one draw command.
    #[serde(default = "default_maximum_texture_image_units")]
    pub maximum_texture_image_units: usize,
    /// Color of a tile with no ready imagery.
    #[serde(default = "default_base_color")]
    pub base_color: [f32; 4],
    #[serde(default)]
    pub show_wireframe: bool,
    #[serde(default = "default_radii")]
    pub ellipsoid_radii: [f64; 3],
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            maximum_texture_image_units: default_maximum_texture_image_units(),
            base_color: default_base_color(),
            show_wireframe: false,
            ellipsoid_radii: default_radii(),
        }
    }
}

impl SurfaceConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SurfaceConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::new(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.maximum_texture_image_units == 0 {
            return Err(ConfigError::new(
                "maximum_texture_image_units must be at least 1",
            ));
        }
        if self.base_color.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::new("base_color entries must be finite"));
        }
        for (axis, radius) in ["x", "y", "z"].iter().zip(self.ellipsoid_radii) {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(ConfigError::new(format!(
                    "ellipsoid_radii.{axis} must be a positive finite value"
                )));
            }
        }
        Ok(())
    }

    pub fn ellipsoid(&self) -> Ellipsoid {
        let [x, y, z] = self.ellipsoid_radii;
        Ellipsoid::new(x, y, z)
    }

    pub fn base_color(&self) -> glam::Vec4 {
        glam::Vec4::from_array(self.base_color)
    }
}

/// Settings for instanced tile content.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Tint applied to every instance while debug coloring is enabled.
    #[serde(default = "ContentConfig::default_debug_color")]
    pub debug_color: Color,
}

impl ContentConfig {
    fn default_debug_color() -> Color {
        Color::new(1.0, 0.0, 1.0, 1.0)
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            debug_color: Self::default_debug_color(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SurfaceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.maximum_texture_image_units, 16);
        assert_eq!(config.ellipsoid().radii, Ellipsoid::WGS84.radii);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = SurfaceConfig::from_json(r#"{ "maximum_texture_image_units": 4 }"#).unwrap();
        assert_eq!(config.maximum_texture_image_units, 4);
        assert!(!config.show_wireframe);
        assert_eq!(config.base_color, [0.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn rejects_zero_texture_units() {
        let err = SurfaceConfig::from_json(r#"{ "maximum_texture_image_units": 0 }"#).unwrap_err();
        assert!(err.to_string().contains("maximum_texture_image_units"));
    }

    #[test]
    fn rejects_non_positive_radius() {
        let config = SurfaceConfig {
            ellipsoid_radii: [1.0, 0.0, 1.0],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ellipsoid_radii.y"));
    }
}
