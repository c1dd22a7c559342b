//! Switched cameras: virtual streams whose physical source is picked remotely.
//!
//! The controller writes either a camera index or a camera name to the
//! selector key. Every change notification is run through [`next_selection`];
//! values that do not name a started camera are ignored and the previous
//! source stays active.

use std::convert::TryFrom;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use slog::{debug, info, o, warn, Logger};

use crate::camera_registry::CameraRegistry;
use crate::config::SwitchedCameraConfig;
use crate::table::{TableSubscriber, TableValue};
use crate::utils::lock;

/// Receives the source chosen for a switched stream.
pub trait SourceBinding: Send + Sync {
    fn set_source(&self, index: usize);
}

const NO_SOURCE: usize = usize::MAX;

/// Routing state of one switched output stream.
///
/// Serves nothing until a source is first selected.
#[derive(Debug)]
pub struct SwitchedStream {
    name: String,
    active: AtomicUsize,
}

impl SwitchedStream {
    pub fn new(name: &str) -> SwitchedStream {
        SwitchedStream {
            name: name.to_string(),
            active: AtomicUsize::new(NO_SOURCE),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn active_source(&self) -> Option<usize> {
        match self.active.load(Ordering::Acquire) {
            NO_SOURCE => None,
            index => Some(index),
        }
    }
}

impl SourceBinding for SwitchedStream {
    fn set_source(&self, index: usize) {
        self.active.store(index, Ordering::Release);
    }
}

/// The camera a selector value refers to, if any.
pub fn resolve_source(value: &TableValue, registry: &CameraRegistry) -> Option<usize> {
    let in_range = |index: i64| usize::try_from(index).ok().filter(|&i| i < registry.len());
    match value {
        TableValue::Integer(index) => in_range(*index),
        // truncate toward zero
        TableValue::Double(index) if index.is_finite() => in_range(index.trunc() as i64),
        TableValue::String(name) => registry.index_of(name),
        _ => None,
    }
}

/// Selection after `value` is written, starting from `current`.
pub fn next_selection(
    current: Option<usize>,
    value: &TableValue,
    registry: &CameraRegistry,
) -> Option<usize> {
    resolve_source(value, registry).or(current)
}

/// Selector of one switched stream.
pub struct SwitchedCamera {
    config: SwitchedCameraConfig,
    registry: CameraRegistry,
    binding: Arc<dyn SourceBinding>,
    selected: Mutex<Option<usize>>,
    log: Logger,
}

impl SwitchedCamera {
    pub fn new(
        config: SwitchedCameraConfig,
        registry: CameraRegistry,
        binding: Arc<dyn SourceBinding>,
        log: &Logger,
    ) -> SwitchedCamera {
        let log = log.new(o!("switched camera" => config.name.clone(), "key" => config.key.clone()));
        SwitchedCamera {
            config,
            registry,
            binding,
            selected: Mutex::new(None),
            log,
        }
    }

    /// Create the selector and subscribe it to its key.
    pub fn start(
        config: SwitchedCameraConfig,
        registry: CameraRegistry,
        binding: Arc<dyn SourceBinding>,
        subscriber: &dyn TableSubscriber,
        log: &Logger,
    ) -> Arc<SwitchedCamera> {
        info!(
            log,
            "Starting switched camera '{}' on {}", config.name, config.key
        );
        let camera = Arc::new(SwitchedCamera::new(config, registry, binding, log));
        if camera.registry.is_empty() {
            warn!(
                camera.log,
                "no cameras available, switched camera will stay unassigned"
            );
        }

        let listener = Arc::clone(&camera);
        subscriber.subscribe(
            &camera.config.key,
            Box::new(move |value: &TableValue| {
                listener.on_value(value);
            }),
        );
        camera
    }

    pub fn config(&self) -> &SwitchedCameraConfig {
        &self.config
    }

    pub fn selected(&self) -> Option<usize> {
        *lock(&self.selected)
    }

    /// Apply one change of the selector key and return the selection after it.
    ///
    /// The binding is only touched when the selection changes.
    pub fn on_value(&self, value: &TableValue) -> Option<usize> {
        let mut selected = lock(&self.selected);
        let next = next_selection(*selected, value, &self.registry);
        match next {
            Some(index) if next != *selected => {
                self.binding.set_source(index);
                debug!(self.log, "selected source {} after {}", index, value);
            }
            _ => debug!(self.log, "keeping source {:?} after {}", next, value),
        }
        *selected = next;
        next
    }
}
