use std::sync::Arc;

use slog::{info, Logger};

use crate::camera_registry::CameraRegistry;
use crate::config::{CameraConfig, NtMode, VisionConfig};
use crate::selector::{SwitchedCamera, SwitchedStream};
use crate::table::TableSubscriber;

/// Cameras and switched streams started from one configuration.
pub struct Coprocessor {
    registry: CameraRegistry,
    switched: Vec<(Arc<SwitchedStream>, Arc<SwitchedCamera>)>,
}

impl Coprocessor {
    pub fn start(config: &VisionConfig, subscriber: &dyn TableSubscriber, log: &Logger) -> Coprocessor {
        match config.nt_mode {
            NtMode::Server => info!(log, "Setting up NetworkTables server"),
            NtMode::Client => info!(
                log,
                "Setting up NetworkTables client for team {}", config.team
            ),
        }

        for camera in &config.cameras {
            info!(log, "Starting camera '{}' on {}", camera.name, camera.path);
        }
        let registry = CameraRegistry::new(config.cameras.clone());

        let switched = config
            .switched_cameras
            .iter()
            .map(|switched_config| {
                let stream = Arc::new(SwitchedStream::new(&switched_config.name));
                let camera = SwitchedCamera::start(
                    switched_config.clone(),
                    registry.clone(),
                    stream.clone(),
                    subscriber,
                    log,
                );
                (stream, camera)
            })
            .collect();

        Coprocessor { registry, switched }
    }

    pub fn registry(&self) -> &CameraRegistry {
        &self.registry
    }

    /// The camera the tag pipeline runs on: the first one configured.
    pub fn vision_camera(&self) -> Option<&CameraConfig> {
        self.registry.get(0)
    }

    pub fn switched_streams(&self) -> impl Iterator<Item = &Arc<SwitchedStream>> {
        self.switched.iter().map(|(stream, _)| stream)
    }

    pub fn switched_stream(&self, name: &str) -> Option<&Arc<SwitchedStream>> {
        self.switched_streams().find(|stream| stream.name() == name)
    }

    pub fn switched_camera(&self, name: &str) -> Option<&Arc<SwitchedCamera>> {
        self.switched
            .iter()
            .map(|(_, camera)| camera)
            .find(|camera| camera.config().name == name)
    }
}
