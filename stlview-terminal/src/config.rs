//! Terminal front-end settings, read from JSON

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use stlview_core::ViewerConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub viewer: ViewerConfig,
    pub frame_rate: u32,
    /// Radians per orbit key press
    pub orbit_step: f32,
    /// Height of a terminal cell relative to its width
    pub cell_aspect: f32,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            viewer: ViewerConfig::default(),
            frame_rate: 30,
            orbit_step: 0.1,
            cell_aspect: 2.0,
        }
    }
}

impl TerminalConfig {
    /// `<config dir>/stlview/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("stlview").join("config.json"))
    }

    /// Settings from `path` (or the default path). A missing file gives the
    /// defaults; so does a malformed one, with a warning.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Self::default();
        };

        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) => {
                info!("no config at {}: {e}", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str(&json) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring malformed config {}: {e}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use stlview_core::Representation;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TerminalConfig::load_or_default(Some(&dir.path().join("none.json")));
        assert_eq!(config, TerminalConfig::default());
    }

    #[test]
    fn nested_viewer_settings_are_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "frame_rate": 10, "viewer": {{ "representation": "points" }} }}"#
        )
        .unwrap();
        let config = TerminalConfig::load_or_default(Some(file.path()));
        assert_eq!(config.frame_rate, 10);
        assert_eq!(config.viewer.representation, Representation::Points);
        assert_eq!(config.cell_aspect, 2.0);
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "frame_rate = 10").unwrap();
        assert_eq!(
            TerminalConfig::load_or_default(Some(file.path())),
            TerminalConfig::default()
        );
    }
}
