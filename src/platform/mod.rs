//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Wall-clock time for high score timestamps
//! - Pointer/world mapping for the letterboxed play field

use glam::Vec2;

/// Lower-left corner of the visible play field (world units)
pub const VIEW_MIN: Vec2 = Vec2::new(-12.0, -3.5);
/// Upper-right corner of the visible play field (world units)
pub const VIEW_MAX: Vec2 = Vec2::new(12.0, 11.0);

/// Unix time in milliseconds, for high score timestamps
#[cfg(target_arch = "wasm32")]
pub fn unix_time_ms() -> f64 {
    js_sys::Date::now()
}

/// Unix time in milliseconds, for high score timestamps
#[cfg(not(target_arch = "wasm32"))]
pub fn unix_time_ms() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or_default()
}

/// Scale and offset of the letterboxed view on a `width` x `height` surface
fn view_fit(width: f32, height: f32) -> (f32, Vec2) {
    let view = VIEW_MAX - VIEW_MIN;
    let scale = (width / view.x).min(height / view.y);
    let offset = Vec2::new(width - view.x * scale, height - view.y * scale) * 0.5;
    (scale, offset)
}

/// Map a pointer position (pixels, y down) on a `width` x `height` surface
/// to world space. The view is letterboxed to keep its aspect ratio;
/// `None` for positions in the bars or for a degenerate surface.
pub fn pointer_to_world(px: f32, py: f32, width: f32, height: f32) -> Option<Vec2> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    let view = VIEW_MAX - VIEW_MIN;
    let (scale, offset) = view_fit(width, height);

    let local = (Vec2::new(px, py) - offset) / scale;
    if local.x < 0.0 || local.y < 0.0 || local.x > view.x || local.y > view.y {
        return None;
    }
    Some(Vec2::new(VIEW_MIN.x + local.x, VIEW_MAX.y - local.y))
}

/// World position to surface pixels (y down)
pub fn world_to_screen(world: Vec2, width: f32, height: f32) -> Vec2 {
    let (scale, offset) = view_fit(width, height);
    offset + Vec2::new(world.x - VIEW_MIN.x, VIEW_MAX.y - world.y) * scale
}

/// World length to surface pixels
pub fn world_scale(width: f32, height: f32) -> f32 {
    view_fit(width, height).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_corners_and_centre() {
        // Surface with the exact view aspect ratio
        let (w, h) = (480.0, 290.0);
        let top_left = pointer_to_world(0.0, 0.0, w, h).unwrap();
        assert!(top_left.abs_diff_eq(Vec2::new(VIEW_MIN.x, VIEW_MAX.y), 1e-4));
        let bottom_right = pointer_to_world(w, h, w, h).unwrap();
        assert!(bottom_right.abs_diff_eq(Vec2::new(VIEW_MAX.x, VIEW_MIN.y), 1e-4));
        let centre = pointer_to_world(w / 2.0, h / 2.0, w, h).unwrap();
        assert!(centre.abs_diff_eq((VIEW_MIN + VIEW_MAX) * 0.5, 1e-4));
    }

    #[test]
    fn test_screen_mapping_inverts_pointer_mapping() {
        let (w, h) = (1280.0, 600.0);
        let world = Vec2::new(-3.5, 4.25);
        let screen = world_to_screen(world, w, h);
        let back = pointer_to_world(screen.x, screen.y, w, h).unwrap();
        assert!(back.abs_diff_eq(world, 1e-3));
        assert!((world_scale(w, h) - 600.0 / 14.5).abs() < 1e-4);
    }

    #[test]
    fn test_letterbox_bars_are_outside() {
        // Too wide: bars left and right
        let (w, h) = (1000.0, 290.0);
        assert!(pointer_to_world(10.0, 100.0, w, h).is_none());
        assert!(pointer_to_world(500.0, 100.0, w, h).is_some());
        assert!(pointer_to_world(1.0, 1.0, 0.0, 100.0).is_none());
    }

    #[test]
    fn test_wall_clock_is_unix_ms() {
        assert!(unix_time_ms() > 1.0e12);
    }
}
