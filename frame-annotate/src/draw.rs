use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_circle_mut;
use itertools::Itertools;

use crate::bresenham::Bresenham;

/// Colour of tag outlines.
pub const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Stroke width of tag outlines, in pixels.
pub const OUTLINE_WIDTH: u32 = 3;

pub const DEBUG_MARKER_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const DEBUG_MARKER_CENTER: (i32, i32) = (5, 5);
pub const DEBUG_MARKER_RADIUS: i32 = 4;

/// Single channel intensity image handed to the detector.
pub fn to_grayscale(frame: &RgbImage) -> GrayImage {
    image::imageops::grayscale(frame)
}

/// Part of the segment inside the rectangle `min..=max` (Liang-Barsky).
///
/// `None` when the segment misses the rectangle or is not finite.
fn clip_segment(
    start: [f64; 2],
    end: [f64; 2],
    min: [f64; 2],
    max: [f64; 2],
) -> Option<([f64; 2], [f64; 2])> {
    let delta = [end[0] - start[0], end[1] - start[1]];
    if !start.iter().chain(&end).chain(&delta).all(|v| v.is_finite()) {
        return None;
    }

    let (mut t_enter, mut t_exit) = (0.0_f64, 1.0_f64);
    for axis in 0..2 {
        let bounds = [
            (-delta[axis], start[axis] - min[axis]),
            (delta[axis], max[axis] - start[axis]),
        ];
        for &(p, q) in bounds.iter() {
            if p == 0.0 {
                // parallel to this edge
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t_enter = t_enter.max(t);
            } else {
                t_exit = t_exit.min(t);
            }
        }
    }
    if t_enter > t_exit {
        return None;
    }
    let at = |t: f64| [start[0] + t * delta[0], start[1] + t * delta[1]];
    Some((at(t_enter), at(t_exit)))
}

/// Draw a segment with a square brush `width` pixels wide.
///
/// The segment is clipped to the image (plus the brush reach) first, so the
/// cost is bounded by the image size whatever the endpoints. Endpoints are
/// rounded to the nearest pixel.
pub fn draw_thick_line(
    image: &mut RgbImage,
    start: [f64; 2],
    end: [f64; 2],
    width: u32,
    color: Rgb<u8>,
) {
    let width = width.max(1) as i32;
    let low = -(width - 1) / 2;
    let high = low + width - 1;
    let (img_w, img_h) = (image.width() as i32, image.height() as i32);

    let margin = f64::from(width);
    let max = [
        f64::from(img_w) - 1.0 + margin,
        f64::from(img_h) - 1.0 + margin,
    ];
    let (start, end) = match clip_segment(start, end, [-margin, -margin], max) {
        Some(segment) => segment,
        None => return,
    };

    let start = (start[0].round() as i32, start[1].round() as i32);
    let end = (end[0].round() as i32, end[1].round() as i32);
    for (x, y) in Bresenham::new(start, end) {
        for (dx, dy) in (low..=high).cartesian_product(low..=high) {
            let (px, py) = (x + dx, y + dy);
            if px < 0 || py < 0 || px >= img_w || py >= img_h {
                continue;
            }
            image.put_pixel(px as u32, py as u32, color);
        }
    }
}

/// Draw a closed polygon through `corners`, joining the last corner back to the first.
pub fn draw_closed_outline(image: &mut RgbImage, corners: &[[f64; 2]], width: u32, color: Rgb<u8>) {
    if corners.len() < 2 {
        return;
    }
    for (start, end) in corners.iter().circular_tuple_windows() {
        draw_thick_line(image, *start, *end, width, color);
    }
}

/// Static overlay in the top left corner, drawn on every processed frame.
pub fn draw_debug_marker(image: &mut RgbImage) {
    draw_hollow_circle_mut(
        image,
        DEBUG_MARKER_CENTER,
        DEBUG_MARKER_RADIUS,
        DEBUG_MARKER_COLOR,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    #[test]
    fn test_thick_line_width() {
        let mut image = RgbImage::new(20, 20);
        draw_thick_line(&mut image, [2.0, 10.0], [17.0, 10.0], 3, OUTLINE_COLOR);

        for x in 2..=17 {
            assert_eq!(*image.get_pixel(x, 9), OUTLINE_COLOR);
            assert_eq!(*image.get_pixel(x, 10), OUTLINE_COLOR);
            assert_eq!(*image.get_pixel(x, 11), OUTLINE_COLOR);
            assert_eq!(*image.get_pixel(x, 8), BLACK);
            assert_eq!(*image.get_pixel(x, 12), BLACK);
        }
    }

    #[test]
    fn test_line_is_clipped() {
        let mut image = RgbImage::new(10, 10);
        draw_thick_line(&mut image, [-5.0, 0.0], [30.0, 0.0], 3, OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(0, 0), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(9, 1), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(9, 2), BLACK);
    }

    #[test]
    fn test_clip_segment() {
        let clipped = clip_segment([-10.0, -10.0], [20.0, 20.0], [0.0, 0.0], [10.0, 10.0]);
        assert_eq!(clipped, Some(([0.0, 0.0], [10.0, 10.0])));

        let inside = clip_segment([2.0, 3.0], [4.0, 5.0], [0.0, 0.0], [10.0, 10.0]);
        assert_eq!(inside, Some(([2.0, 3.0], [4.0, 5.0])));

        assert_eq!(
            clip_segment([11.0, 0.0], [11.0, 10.0], [0.0, 0.0], [10.0, 10.0]),
            None
        );
        assert_eq!(
            clip_segment([-5.0, 12.0], [12.0, 30.0], [0.0, 0.0], [10.0, 10.0]),
            None
        );
        assert_eq!(
            clip_segment([f64::NAN, 1.0], [5.0, 1.0], [0.0, 0.0], [10.0, 10.0]),
            None
        );
    }

    #[test]
    fn test_far_away_endpoints() {
        let mut image = RgbImage::new(64, 48);
        let corners = [[-3e9, 10.0], [3e9, 10.0], [3e9, 5.0], [-3e9, 5.0]];
        draw_closed_outline(&mut image, &corners, OUTLINE_WIDTH, OUTLINE_COLOR);

        for x in 0..64 {
            for y in [4, 5, 6, 9, 10, 11].iter() {
                assert_eq!(*image.get_pixel(x, *y), OUTLINE_COLOR);
            }
            assert_eq!(*image.get_pixel(x, 7), BLACK);
            assert_eq!(*image.get_pixel(x, 12), BLACK);
        }

        // a huge off-screen edge only costs its visible part
        let mut image = RgbImage::new(64, 48);
        draw_thick_line(&mut image, [-1e15, -1e15], [1e15, 1e15], 3, OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(20, 20), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(40, 20), BLACK);
    }

    #[test]
    fn test_outside_segment_draws_nothing() {
        let mut image = RgbImage::new(10, 10);
        draw_thick_line(&mut image, [100.0, 100.0], [200.0, 300.0], 3, OUTLINE_COLOR);
        draw_thick_line(&mut image, [-1e12, -50.0], [1e12, -50.0], 3, OUTLINE_COLOR);
        draw_thick_line(&mut image, [f64::NAN, 1.0], [5.0, 5.0], 3, OUTLINE_COLOR);
        draw_thick_line(&mut image, [f64::INFINITY, 1.0], [5.0, 5.0], 3, OUTLINE_COLOR);
        assert!(image.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn test_closed_outline() {
        let mut image = RgbImage::new(40, 40);
        // bottom-left, bottom-right, top-right, top-left
        let corners = [[10.0, 30.0], [30.0, 30.0], [30.0, 10.0], [10.0, 10.0]];
        draw_closed_outline(&mut image, &corners, OUTLINE_WIDTH, OUTLINE_COLOR);

        // every edge, including the closing top-left -> bottom-left one
        assert_eq!(*image.get_pixel(20, 30), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(30, 20), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(20, 10), OUTLINE_COLOR);
        assert_eq!(*image.get_pixel(10, 20), OUTLINE_COLOR);
        // outline only, interior untouched
        assert_eq!(*image.get_pixel(20, 20), BLACK);
        assert_eq!(*image.get_pixel(13, 20), BLACK);
    }

    #[test]
    fn test_debug_marker() {
        let mut image = RgbImage::new(32, 32);
        draw_debug_marker(&mut image);

        let (cx, cy) = DEBUG_MARKER_CENTER;
        let r = DEBUG_MARKER_RADIUS;
        assert_eq!(*image.get_pixel((cx + r) as u32, cy as u32), DEBUG_MARKER_COLOR);
        assert_eq!(*image.get_pixel((cx - r) as u32, cy as u32), DEBUG_MARKER_COLOR);
        assert_eq!(*image.get_pixel(cx as u32, (cy + r) as u32), DEBUG_MARKER_COLOR);
        assert_eq!(*image.get_pixel(cx as u32, cy as u32), BLACK);
        assert_eq!(*image.get_pixel(20, 20), BLACK);
    }

    #[test]
    fn test_to_grayscale() {
        let mut image = RgbImage::new(4, 3);
        image.put_pixel(1, 1, Rgb([255, 255, 255]));
        let gray = to_grayscale(&image);
        assert_eq!(gray.dimensions(), (4, 3));
        assert_eq!(gray.get_pixel(1, 1).0, [255]);
        assert_eq!(gray.get_pixel(0, 0).0, [0]);
    }
}
