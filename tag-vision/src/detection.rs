//! Adapter around the fiducial tag detector.
//!
//! The detector itself is an external component; the rest of the crate only
//! depends on [`TagDetector`] and on the [`Detection`] records it returns.

use std::collections::VecDeque;
use std::fmt;

use image::GrayImage;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    pub fn to_arr(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

/// One tag found in a frame.
///
/// `corners` wrap counter-clockwise around the tag, starting at the bottom left
/// corner, in image pixel coordinates.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Detection {
    pub id: i64,
    pub corners: [Point; 4],
    pub center: Point,
}

impl Detection {
    pub fn new(id: i64, corners: [Point; 4], center: Point) -> Detection {
        Detection {
            id,
            corners,
            center,
        }
    }

    /// Axis aligned square tag of half-size `half` around `center`.
    pub fn square(id: i64, center: Point, half: f64) -> Detection {
        let corners = [
            Point::new(center.x - half, center.y + half),
            Point::new(center.x + half, center.y + half),
            Point::new(center.x + half, center.y - half),
            Point::new(center.x - half, center.y - half),
        ];
        Detection::new(id, corners, center)
    }

    /// Corners in drawing order: bottom-left, bottom-right, top-right, top-left.
    pub fn outline(&self) -> [[f64; 2]; 4] {
        [
            self.corners[0].to_arr(),
            self.corners[1].to_arr(),
            self.corners[2].to_arr(),
            self.corners[3].to_arr(),
        ]
    }
}

/// Tag families understood by the detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagFamily {
    Tag36h11,
}

impl TagFamily {
    pub fn name(self) -> &'static str {
        match self {
            TagFamily::Tag36h11 => "tag36h11",
        }
    }
}

impl fmt::Display for TagFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DetectionError {
    #[error("frame is empty ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("no tag family configured")]
    FamilyNotConfigured,
    #[error("detector failure: {0}")]
    Backend(String),
}

/// A fiducial tag detector.
///
/// Detections are returned in the detector's own order; callers must not
/// assume any sorting.
pub trait TagDetector: Send {
    fn add_family(&mut self, family: TagFamily) -> Result<(), DetectionError>;

    fn detect(&mut self, image: &GrayImage) -> Result<Vec<Detection>, DetectionError>;
}

fn check_frame(image: &GrayImage) -> Result<(), DetectionError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectionError::EmptyFrame { width, height });
    }
    Ok(())
}

/// Detector that replays queued results, one entry per frame.
///
/// Once the queue is exhausted every frame yields no detections.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    families: Vec<TagFamily>,
    script: VecDeque<Result<Vec<Detection>, DetectionError>>,
    frames_seen: usize,
}

impl ScriptedDetector {
    pub fn new() -> ScriptedDetector {
        ScriptedDetector::default()
    }

    pub fn from_frames(frames: Vec<Vec<Detection>>) -> ScriptedDetector {
        let mut detector = ScriptedDetector::new();
        for frame in frames {
            detector.push_frame(frame);
        }
        detector
    }

    pub fn push_frame(&mut self, detections: Vec<Detection>) {
        self.script.push_back(Ok(detections));
    }

    pub fn push_failure(&mut self, error: DetectionError) {
        self.script.push_back(Err(error));
    }

    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    pub fn families(&self) -> &[TagFamily] {
        &self.families
    }
}

impl TagDetector for ScriptedDetector {
    fn add_family(&mut self, family: TagFamily) -> Result<(), DetectionError> {
        if !self.families.contains(&family) {
            self.families.push(family);
        }
        Ok(())
    }

    fn detect(&mut self, image: &GrayImage) -> Result<Vec<Detection>, DetectionError> {
        if self.families.is_empty() {
            return Err(DetectionError::FamilyNotConfigured);
        }
        check_frame(image)?;
        self.frames_seen += 1;
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}
