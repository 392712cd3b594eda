//! Viewer settings shared by the front ends

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::Result;
use crate::representation::Representation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Mode applied to freshly loaded meshes
    pub representation: Representation,
    /// Per-file colors and click-to-identify. Off gives the plain viewer.
    pub annotations: bool,
    /// Vertical field of view
    pub fov_degrees: f32,
    pub background: Rgb,
    /// Seed for the random per-file colors; `None` lets the host pick one
    pub color_seed: Option<u64>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            representation: Representation::Surface,
            annotations: true,
            fov_degrees: 45.0,
            background: Rgb::new(0.08, 0.08, 0.1),
            color_seed: None,
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn fov_radians(&self) -> f32 {
        self.fov_degrees.clamp(1.0, 170.0).to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_fills_defaults() {
        let config = ViewerConfig::from_json(r#"{ "representation": "wireframe" }"#).unwrap();
        assert_eq!(config.representation, Representation::Wireframe);
        assert!(config.annotations);
        assert_eq!(config.fov_degrees, 45.0);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "annotations": false, "color_seed": 42 }}"#).unwrap();
        let config = ViewerConfig::load(file.path()).unwrap();
        assert!(!config.annotations);
        assert_eq!(config.color_seed, Some(42));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = ViewerConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::error::ViewerError::Config(_)));
    }

    #[test]
    fn fov_is_clamped() {
        let config = ViewerConfig {
            fov_degrees: 500.0,
            ..Default::default()
        };
        assert!((config.fov_radians() - 170f32.to_radians()).abs() < 1e-6);
    }
}
