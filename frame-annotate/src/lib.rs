#![allow(missing_docs)]

pub mod bresenham;
pub mod draw;
pub mod frame_file;

pub use draw::{
    draw_closed_outline, draw_debug_marker, draw_thick_line, to_grayscale, DEBUG_MARKER_CENTER,
    DEBUG_MARKER_COLOR, DEBUG_MARKER_RADIUS, OUTLINE_COLOR, OUTLINE_WIDTH,
};
pub use frame_file::FrameWriter;
