use std::time::Instant;

use frame_annotate::{
    draw_closed_outline, draw_debug_marker, to_grayscale, OUTLINE_COLOR, OUTLINE_WIDTH,
};
use image::RgbImage;
use slog::{debug, o, Logger};

use crate::detection::{Detection, DetectionError, TagDetector, TagFamily};
use crate::IS_DEBUG;

/// Tag ids marking the amp; their centroid is reported separately.
pub const AMP_TAG_IDS: [i64; 2] = [5, 6];
/// Reported amp center when no amp tag is in view.
pub const NO_TARGET: f64 = -1.0;

/// What the amp center outputs show for a frame without an amp tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CenterPolicy {
    /// Report [`NO_TARGET`] again.
    ResetEachFrame,
    /// Keep reporting the last amp tag position seen.
    HoldLast,
}

impl Default for CenterPolicy {
    fn default() -> Self {
        CenterPolicy::ResetEachFrame
    }
}

/// Output of one processed frame.
#[derive(Clone, Debug)]
pub struct PipelineResult {
    pub annotated: RgbImage,
    /// Every detection in the frame, amp or not.
    pub target_count: usize,
    pub amp_center_x: f64,
    pub amp_center_y: f64,
}

pub fn is_amp_tag(detection: &Detection) -> bool {
    AMP_TAG_IDS.contains(&detection.id)
}

/// Per-frame tag detection and annotation.
///
/// Owns the detector, so frames of one camera are processed strictly one at a time.
pub struct TagPipeline<D> {
    detector: D,
    policy: CenterPolicy,
    amp_center: [f64; 2],
    log: Logger,
}

impl<D: TagDetector> TagPipeline<D> {
    /// Configures `detector` for the `tag36h11` family.
    pub fn new(mut detector: D, policy: CenterPolicy, log: &Logger) -> Result<Self, DetectionError> {
        detector.add_family(TagFamily::Tag36h11)?;
        Ok(TagPipeline {
            detector,
            policy,
            amp_center: [NO_TARGET, NO_TARGET],
            log: log.new(o!("family" => TagFamily::Tag36h11.name())),
        })
    }

    pub fn policy(&self) -> CenterPolicy {
        self.policy
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Detect tags in `frame` and annotate it in place.
    ///
    /// A detector failure is returned as is and nothing is drawn.
    pub fn process(&mut self, mut frame: RgbImage) -> Result<PipelineResult, DetectionError> {
        let tick = Instant::now();
        let gray = to_grayscale(&frame);
        let detections = self.detector.detect(&gray)?;

        if IS_DEBUG {
            debug!(
                self.log,
                "detect took {:.3}s",
                tick.elapsed().as_millis() as f64 / 1000.0
            );
        }

        if self.policy == CenterPolicy::ResetEachFrame {
            self.amp_center = [NO_TARGET, NO_TARGET];
        }

        for detection in &detections {
            draw_closed_outline(
                &mut frame,
                &detection.outline(),
                OUTLINE_WIDTH,
                OUTLINE_COLOR,
            );
            // last amp tag in detector order wins
            if is_amp_tag(detection) {
                self.amp_center = [detection.center.x, detection.center.y];
            }
        }
        draw_debug_marker(&mut frame);

        debug!(
            self.log,
            "targets {} amp center ({}, {})",
            detections.len(),
            self.amp_center[0],
            self.amp_center[1]
        );

        Ok(PipelineResult {
            annotated: frame,
            target_count: detections.len(),
            amp_center_x: self.amp_center[0],
            amp_center_y: self.amp_center[1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Point, ScriptedDetector};
    use crate::utils::discard_logger;
    use assert_approx_eq::assert_approx_eq;
    use frame_annotate::{DEBUG_MARKER_CENTER, DEBUG_MARKER_COLOR, DEBUG_MARKER_RADIUS};
    use image::Rgb;
    use rand::Rng;

    fn pipeline(frames: Vec<Vec<Detection>>, policy: CenterPolicy) -> TagPipeline<ScriptedDetector> {
        TagPipeline::new(ScriptedDetector::from_frames(frames), policy, &discard_logger()).unwrap()
    }

    fn blank() -> RgbImage {
        RgbImage::new(160, 120)
    }

    fn tag(id: i64, x: f64, y: f64) -> Detection {
        Detection::square(id, Point::new(x, y), 6.0)
    }

    #[test]
    fn test_configures_family() {
        let pipeline = pipeline(Vec::new(), CenterPolicy::default());
        assert_eq!(pipeline.detector().families(), &[TagFamily::Tag36h11]);
        assert_eq!(pipeline.policy(), CenterPolicy::ResetEachFrame);
    }

    #[test]
    fn test_no_detections() {
        let mut pipeline = pipeline(vec![Vec::new()], CenterPolicy::ResetEachFrame);
        let result = pipeline.process(blank()).unwrap();
        assert_eq!(result.target_count, 0);
        assert_eq!(result.amp_center_x, NO_TARGET);
        assert_eq!(result.amp_center_y, NO_TARGET);

        let (cx, cy) = DEBUG_MARKER_CENTER;
        assert_eq!(
            *result
                .annotated
                .get_pixel((cx + DEBUG_MARKER_RADIUS) as u32, cy as u32),
            DEBUG_MARKER_COLOR
        );
        assert!(!result.annotated.pixels().any(|p| *p == OUTLINE_COLOR));
    }

    #[test]
    fn test_single_amp_tag() {
        for id in AMP_TAG_IDS.iter() {
            let mut pipeline = pipeline(
                vec![vec![tag(1, 20.0, 20.0), tag(*id, 72.25, 40.5)]],
                CenterPolicy::ResetEachFrame,
            );
            let result = pipeline.process(blank()).unwrap();
            assert_eq!(result.target_count, 2);
            assert_approx_eq!(result.amp_center_x, 72.25);
            assert_approx_eq!(result.amp_center_y, 40.5);
        }
    }

    #[test]
    fn test_last_amp_tag_wins() {
        let mut pipeline = pipeline(
            vec![
                vec![tag(5, 30.0, 30.0), tag(6, 90.0, 60.0)],
                vec![tag(6, 90.0, 60.0), tag(5, 30.0, 30.0)],
            ],
            CenterPolicy::ResetEachFrame,
        );
        let first = pipeline.process(blank()).unwrap();
        assert_eq!((first.amp_center_x, first.amp_center_y), (90.0, 60.0));
        let second = pipeline.process(blank()).unwrap();
        assert_eq!((second.amp_center_x, second.amp_center_y), (30.0, 30.0));
    }

    #[test]
    fn test_other_tags_never_move_center() {
        let mut rng = rand::thread_rng();
        let frames = (0..20)
            .map(|_| {
                (0..rng.gen_range(1..8))
                    .map(|_| {
                        let mut id = rng.gen_range(0..30);
                        if AMP_TAG_IDS.contains(&id) {
                            id += 10;
                        }
                        tag(id, rng.gen_range(0.0..160.0), rng.gen_range(0.0..120.0))
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let counts = frames.iter().map(Vec::len).collect::<Vec<_>>();

        let mut pipeline = pipeline(frames, CenterPolicy::HoldLast);
        for count in counts {
            let result = pipeline.process(blank()).unwrap();
            assert_eq!(result.target_count, count);
            assert_eq!(result.amp_center_x, NO_TARGET);
            assert_eq!(result.amp_center_y, NO_TARGET);
        }
    }

    #[test]
    fn test_reset_each_frame() {
        let mut pipeline = pipeline(
            vec![vec![tag(5, 100.0, 50.0)], Vec::new(), vec![tag(9, 10.0, 10.0)]],
            CenterPolicy::ResetEachFrame,
        );
        let seen = pipeline.process(blank()).unwrap();
        assert_eq!((seen.amp_center_x, seen.amp_center_y), (100.0, 50.0));

        let empty = pipeline.process(blank()).unwrap();
        assert_eq!(empty.target_count, 0);
        assert_eq!((empty.amp_center_x, empty.amp_center_y), (NO_TARGET, NO_TARGET));

        let other = pipeline.process(blank()).unwrap();
        assert_eq!(other.target_count, 1);
        assert_eq!((other.amp_center_x, other.amp_center_y), (NO_TARGET, NO_TARGET));
    }

    #[test]
    fn test_hold_last() {
        let mut pipeline = pipeline(
            vec![vec![tag(6, 100.0, 50.0)], Vec::new(), vec![tag(9, 10.0, 10.0)]],
            CenterPolicy::HoldLast,
        );
        pipeline.process(blank()).unwrap();

        let empty = pipeline.process(blank()).unwrap();
        assert_eq!(empty.target_count, 0);
        assert_eq!((empty.amp_center_x, empty.amp_center_y), (100.0, 50.0));

        let other = pipeline.process(blank()).unwrap();
        assert_eq!(other.target_count, 1);
        assert_eq!((other.amp_center_x, other.amp_center_y), (100.0, 50.0));
    }

    #[test]
    fn test_detector_failure_is_surfaced() {
        let mut detector = ScriptedDetector::from_frames(vec![vec![tag(5, 40.0, 40.0)]]);
        detector.push_failure(DetectionError::Backend("decoder fault".to_string()));
        detector.push_frame(Vec::new());
        let mut pipeline =
            TagPipeline::new(detector, CenterPolicy::HoldLast, &discard_logger()).unwrap();

        pipeline.process(blank()).unwrap();
        assert_eq!(
            pipeline.process(blank()).unwrap_err(),
            DetectionError::Backend("decoder fault".to_string())
        );
        // a failed frame leaves the held center alone
        let next = pipeline.process(blank()).unwrap();
        assert_eq!((next.amp_center_x, next.amp_center_y), (40.0, 40.0));
    }

    #[test]
    fn test_empty_frame_fails() {
        let mut pipeline = pipeline(vec![vec![tag(5, 1.0, 1.0)]], CenterPolicy::ResetEachFrame);
        assert!(matches!(
            pipeline.process(RgbImage::new(0, 0)),
            Err(DetectionError::EmptyFrame { .. })
        ));
    }

    #[test]
    fn test_partially_visible_tags() {
        let far = Detection::new(
            9,
            [
                Point::new(-3e9, 10.0),
                Point::new(3e9, 10.0),
                Point::new(3e9, 5.0),
                Point::new(-3e9, 5.0),
            ],
            Point::new(0.0, 7.5),
        );
        // amp tag hanging over the right edge
        let edge = tag(5, 158.0, 100.0);
        let mut pipeline = pipeline(
            vec![vec![far, edge], vec![tag(1, 20.0, 20.0)]],
            CenterPolicy::ResetEachFrame,
        );

        let result = pipeline.process(blank()).unwrap();
        assert_eq!(result.target_count, 2);
        assert_eq!((result.amp_center_x, result.amp_center_y), (158.0, 100.0));
        let image = &result.annotated;
        assert_eq!(*image.get_pixel(80, 10), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(159, 5), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(152, 100), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(159, 94), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(157, 100), Rgb([0, 0, 0]));

        // the worker thread keeps going on the next frame
        let next = pipeline.process(blank()).unwrap();
        assert_eq!(next.target_count, 1);
    }

    #[test]
    fn test_outlines_are_drawn() {
        let mut pipeline = pipeline(vec![vec![tag(2, 40.0, 60.0)]], CenterPolicy::ResetEachFrame);
        let result = pipeline.process(blank()).unwrap();
        let image = &result.annotated;

        // edge midpoints of the 12 px square around (40, 60)
        assert_eq!(*image.get_pixel(40, 66), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(46, 60), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(40, 54), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(34, 60), OUTLINE_COLOR);
        // 3 px stroke
        assert_eq!(*image.get_pixel(40, 67), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(40, 68), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(40, 60), Rgb([0, 0, 0]));
    }
}
