//! Mapping from displayed canvas coordinates to surface pixels.

use captionink_core::Surface;
use kurbo::Point;

/// Convert a pointer offset within the displayed canvas into surface
/// coordinates.
///
/// The canvas element may be scaled by CSS; `display_width` and
/// `display_height` are its rendered size. A zero display size maps 1:1.
pub fn surface_point(offset: Point, display_width: f64, display_height: f64, surface: Surface) -> Point {
    let scale_x = if display_width > 0.0 {
        surface.width as f64 / display_width
    } else {
        1.0
    };
    let scale_y = if display_height > 0.0 {
        surface.height as f64 / display_height
    } else {
        1.0
    };
    Point::new(offset.x * scale_x, offset.y * scale_y)
}
