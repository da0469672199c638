use std::{
    env,
    fmt::{self, Display, Formatter},
    fs, io,
    path::Path,
};

use glam::Vec3;
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "MOCAP_VIEWER_CONFIG";

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "Failed to read config file: {}", err),
            ConfigError::Json(err) => write!(f, "Bad config file: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    pub target: [f32; 3],
    pub distance: f32,
    /// Degrees around the Y axis.
    pub yaw: f32,
    /// Degrees above the horizon.
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub yfov: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            target: [0.0, 1.0, 0.0],
            distance: 4.0,
            yaw: 90.0,
            pitch: 10.0,
            yfov: 45.0,
        }
    }
}

impl CameraConfig {
    pub fn target(&self) -> Vec3 {
        Vec3::from_array(self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Base URL of the artifact endpoint. Without one, artifact refs are local paths.
    pub endpoint: Option<String>,
    pub background_color: [f32; 3],
    pub camera: CameraConfig,
    /// Playback rate used when neither source declares one.
    pub default_fps: f32,
    pub mesh_color: [f32; 4],
    pub skeleton_color: [f32; 4],
    pub overlay_visible: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            background_color: [0.1, 0.1, 0.12],
            camera: CameraConfig::default(),
            default_fps: 30.0,
            mesh_color: [0.75, 0.78, 0.85, 1.0],
            skeleton_color: [1.0, 0.55, 0.1, 1.0],
            overlay_visible: true,
        }
    }
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reads the file named by `MOCAP_VIEWER_CONFIG`, falling back to defaults.
    pub fn from_env() -> Self {
        let Some(path) = env::var_os(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.to_string_lossy());
                config
            }
            Err(err) => {
                warn!(
                    "Ignoring config {}: {}",
                    path.to_string_lossy(),
                    err
                );
                Self::default()
            }
        }
    }

    pub fn background_color(&self) -> Vec3 {
        Vec3::from_array(self.background_color)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = ViewerConfig::from_json(r#"{"defaultFps": 24, "camera": {"distance": 8}}"#)
            .unwrap();
        assert_eq!(config.default_fps, 24.0);
        assert_eq!(config.camera.distance, 8.0);
        assert_eq!(config.camera.yfov, CameraConfig::default().yfov);
        assert_eq!(config.endpoint, None);
        assert!(config.overlay_visible);
    }

    #[test]
    fn test_endpoint() {
        let config =
            ViewerConfig::from_json(r#"{"endpoint": "http://127.0.0.1:8188/view"}"#).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://127.0.0.1:8188/view"));
    }

    #[test]
    fn test_malformed_config() {
        assert!(matches!(
            ViewerConfig::from_json("{ defaultFps: "),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            ViewerConfig::load("/nonexistent/viewer.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
