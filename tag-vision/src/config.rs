//! Camera and network configuration.
//!
//! The configuration file is a JSON object:
//!
//! ```text
//! {
//!     "team": <team number>,
//!     "ntmode": <"client" or "server", "client" if unspecified>,
//!     "cameras": [
//!         {
//!             "name": <camera name>,
//!             "path": <path, e.g. "/dev/video0">,
//!             "pixel format": <"MJPEG", "YUYV", etc>,   // optional
//!             "width": <video mode width>,              // optional
//!             "height": <video mode height>,            // optional
//!             "fps": <video mode fps>,                  // optional
//!             "brightness": <percentage brightness>,    // optional
//!             "white balance": <"auto", "hold", value>, // optional
//!             "exposure": <"auto", "hold", value>,      // optional
//!             "properties": [{"name": .., "value": ..}], // optional
//!             "stream": {"properties": [{"name": .., "value": ..}]} // optional
//!         }
//!     ],
//!     "switched cameras": [
//!         {"name": <virtual camera name>, "key": <table key used for selection>}
//!     ]
//! }
//! ```

use std::collections::HashSet;
use std::convert::TryFrom;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value};
use slog::{error, Logger};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/boot/frc.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not open '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("must be JSON object")]
    NotAnObject,
    #[error("could not read {0}")]
    Missing(&'static str),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("camera '{camera}': {reason}")]
    Camera { camera: String, reason: String },
    #[error("switched camera '{camera}': {reason}")]
    SwitchedCamera { camera: String, reason: String },
    #[error("duplicate camera name '{0}'")]
    DuplicateCamera(String),
}

/// How the coprocessor joins the shared data store network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NtMode {
    Client,
    Server,
}

impl Default for NtMode {
    fn default() -> Self {
        NtMode::Client
    }
}

impl FromStr for NtMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("client") {
            Ok(NtMode::Client)
        } else if s.eq_ignore_ascii_case("server") {
            Ok(NtMode::Server)
        } else {
            Err(format!("could not understand ntmode value '{}'", s))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PixelFormat {
    Mjpeg,
    Yuyv,
    Rgb565,
    Bgr,
    Gray,
}

impl TryFrom<String> for PixelFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let format = match value.to_ascii_lowercase().as_str() {
            "mjpeg" => PixelFormat::Mjpeg,
            "yuyv" => PixelFormat::Yuyv,
            "rgb565" => PixelFormat::Rgb565,
            "bgr" => PixelFormat::Bgr,
            "gray" => PixelFormat::Gray,
            _ => return Err(format!("unknown pixel format '{}'", value)),
        };
        Ok(format)
    }
}

/// White balance or exposure setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAutoHold")]
pub enum AutoHoldValue {
    Auto,
    Hold,
    Value(i64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAutoHold {
    Number(i64),
    Text(String),
}

impl TryFrom<RawAutoHold> for AutoHoldValue {
    type Error = String;

    fn try_from(raw: RawAutoHold) -> Result<Self, Self::Error> {
        match raw {
            RawAutoHold::Number(n) => Ok(AutoHoldValue::Value(n)),
            RawAutoHold::Text(s) if s.eq_ignore_ascii_case("auto") => Ok(AutoHoldValue::Auto),
            RawAutoHold::Text(s) if s.eq_ignore_ascii_case("hold") => Ok(AutoHoldValue::Hold),
            RawAutoHold::Text(s) => s
                .parse::<i64>()
                .map(AutoHoldValue::Value)
                .map_err(|_| format!("expected \"auto\", \"hold\" or a number, got '{}'", s)),
        }
    }
}

/// Open-ended device or stream property, passed through to the capture backend.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: Value,
}

/// Typed video mode and device settings of one camera.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CameraSettings {
    #[serde(rename = "pixel format")]
    pub pixel_format: Option<PixelFormat>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub brightness: Option<u8>,
    #[serde(rename = "white balance")]
    pub white_balance: Option<AutoHoldValue>,
    pub exposure: Option<AutoHoldValue>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub properties: Vec<Property>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub name: String,
    pub path: String,
    pub settings: CameraSettings,
    pub stream: Option<StreamConfig>,
    raw: Map<String, Value>,
    raw_stream: Option<Value>,
}

impl CameraConfig {
    /// Camera with default settings, as if configured with only a name and a path.
    pub fn new(name: &str, path: &str) -> CameraConfig {
        let mut raw = Map::new();
        raw.insert("name".to_string(), Value::from(name));
        raw.insert("path".to_string(), Value::from(path));
        CameraConfig {
            name: name.to_string(),
            path: path.to_string(),
            settings: CameraSettings::default(),
            stream: None,
            raw,
            raw_stream: None,
        }
    }

    /// The camera entry exactly as written in the configuration file.
    pub fn device_json(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn stream_json(&self) -> Option<&Value> {
        self.raw_stream.as_ref()
    }

    fn from_json(value: &Value) -> Result<CameraConfig, ConfigError> {
        let obj = value
            .as_object()
            .ok_or(ConfigError::Missing("camera name"))?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ConfigError::Missing("camera name"))?
            .to_string();
        let camera_error = |reason: String| ConfigError::Camera {
            camera: name.clone(),
            reason,
        };
        if name.is_empty() {
            return Err(camera_error("name must not be empty".to_string()));
        }
        let path = obj
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| camera_error("could not read path".to_string()))?
            .to_string();

        let settings: CameraSettings = serde_json::from_value(value.clone())
            .map_err(|e| camera_error(e.to_string()))?;
        if let Some(brightness) = settings.brightness {
            if brightness > 100 {
                return Err(camera_error(format!(
                    "brightness {} is not a percentage",
                    brightness
                )));
            }
        }

        let raw_stream = obj.get("stream").cloned();
        let stream = raw_stream
            .as_ref()
            .map(|s| serde_json::from_value::<StreamConfig>(s.clone()))
            .transpose()
            .map_err(|e| camera_error(format!("stream: {}", e)))?;

        Ok(CameraConfig {
            name,
            path,
            settings,
            stream,
            raw: obj.clone(),
            raw_stream,
        })
    }
}

/// A virtual stream whose source camera is chosen through a table key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwitchedCameraConfig {
    pub name: String,
    pub key: String,
}

impl SwitchedCameraConfig {
    pub fn new(name: &str, key: &str) -> SwitchedCameraConfig {
        SwitchedCameraConfig {
            name: name.to_string(),
            key: key.to_string(),
        }
    }

    fn from_json(value: &Value) -> Result<SwitchedCameraConfig, ConfigError> {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ConfigError::Missing("switched camera name"))?;
        let key = value
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigError::SwitchedCamera {
                camera: name.to_string(),
                reason: "could not read key".to_string(),
            })?;
        Ok(SwitchedCameraConfig::new(name, key))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisionConfig {
    pub team: u32,
    pub nt_mode: NtMode,
    pub cameras: Vec<CameraConfig>,
    pub switched_cameras: Vec<SwitchedCameraConfig>,
}

impl VisionConfig {
    pub fn load(path: impl AsRef<Path>, log: &Logger) -> Result<VisionConfig, ConfigError> {
        let path = path.as_ref();
        let config = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|contents| VisionConfig::from_json_str(&contents, log));
        if let Err(e) = &config {
            error!(log, "config error in '{}': {}", path.display(), e);
        }
        config
    }

    pub fn from_json_str(contents: &str, log: &Logger) -> Result<VisionConfig, ConfigError> {
        let top: Value = serde_json::from_str(contents)?;
        let obj = top.as_object().ok_or(ConfigError::NotAnObject)?;

        let team = obj.get("team").ok_or(ConfigError::Missing("team number"))?;
        let team = team
            .as_u64()
            .and_then(|t| u32::try_from(t).ok())
            .ok_or_else(|| ConfigError::Invalid {
                field: "team number",
                reason: format!("expected a non-negative integer, got {}", team),
            })?;

        // an unknown mode is reported but not fatal
        let mut nt_mode = NtMode::default();
        if let Some(mode) = obj.get("ntmode") {
            match mode.as_str().map(str::parse::<NtMode>) {
                Some(Ok(mode)) => nt_mode = mode,
                Some(Err(reason)) => error!(log, "config error: {}", reason),
                None => error!(log, "config error: ntmode must be a string, got {}", mode),
            }
        }

        let cameras = obj
            .get("cameras")
            .and_then(Value::as_array)
            .ok_or(ConfigError::Missing("cameras"))?
            .iter()
            .map(CameraConfig::from_json)
            .collect::<Result<Vec<_>, _>>()?;

        let mut names = HashSet::new();
        for camera in &cameras {
            if !names.insert(camera.name.as_str()) {
                return Err(ConfigError::DuplicateCamera(camera.name.clone()));
            }
        }

        let switched_cameras = match obj.get("switched cameras") {
            Some(value) => value
                .as_array()
                .ok_or(ConfigError::Missing("switched cameras"))?
                .iter()
                .map(SwitchedCameraConfig::from_json)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(VisionConfig {
            team,
            nt_mode,
            cameras,
            switched_cameras,
        })
    }
}

impl fmt::Display for NtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NtMode::Client => write!(f, "client"),
            NtMode::Server => write!(f, "server"),
        }
    }
}
