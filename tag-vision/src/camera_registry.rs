use std::sync::Arc;

use crate::config::CameraConfig;

/// Started cameras in declaration order, addressed by index.
///
/// Built once at start-up and shared by the vision worker and every switched
/// camera. Cloning only bumps a reference count.
#[derive(Clone, Debug)]
pub struct CameraRegistry {
    cameras: Arc<[CameraConfig]>,
}

impl CameraRegistry {
    pub fn new(cameras: Vec<CameraConfig>) -> CameraRegistry {
        CameraRegistry {
            cameras: cameras.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CameraConfig> {
        self.cameras.get(index)
    }

    /// Index of the first camera named exactly `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.cameras.iter().position(|camera| camera.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CameraConfig> {
        self.cameras.iter()
    }
}
