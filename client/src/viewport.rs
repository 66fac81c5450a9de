//! Map view state: an EPSG:3857 center plus a zoom level, with the screen
//! transform derived from the zoom's resolution.

use chronopolis_shared::projection::{HALF_WORLD_M, lon_lat_to_mercator, resolution_for_zoom};

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 11.0;
pub const DEFAULT_ZOOM: f64 = 6.0;
const ZOOM_SENSITIVITY: f64 = 0.0025;

/// Default view center: Rome.
pub const DEFAULT_CENTER_4326: (f64, f64) = (12.4839, 41.89474);

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: f64,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: lon_lat_to_mercator(DEFAULT_CENTER_4326.0, DEFAULT_CENTER_4326.1),
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl MapView {
    pub fn new(center: (f64, f64), zoom: f64) -> Self {
        let mut view = Self { center, zoom };
        view.clamp();
        view
    }

    /// Projection meters per screen pixel at the current zoom.
    pub fn resolution(&self) -> f64 {
        resolution_for_zoom(self.zoom)
    }

    /// World (EPSG:3857) to screen pixels. Screen y grows downward.
    pub fn world_to_screen(&self, wx: f64, wy: f64, width: f64, height: f64) -> (f64, f64) {
        let res = self.resolution();
        (
            width / 2.0 + (wx - self.center.0) / res,
            height / 2.0 - (wy - self.center.1) / res,
        )
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64, width: f64, height: f64) -> (f64, f64) {
        let res = self.resolution();
        (
            self.center.0 + (sx - width / 2.0) * res,
            self.center.1 - (sy - height / 2.0) * res,
        )
    }

    /// Pan by a screen-space pixel delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let res = self.resolution();
        self.center.0 -= dx * res;
        self.center.1 += dy * res;
        self.clamp();
    }

    /// Wheel zoom toward a screen point: the world coordinate under the
    /// cursor stays fixed.
    pub fn zoom_at(&mut self, delta: f64, sx: f64, sy: f64, width: f64, height: f64) {
        let (wx, wy) = self.screen_to_world(sx, sy, width, height);
        self.zoom = (self.zoom - delta * ZOOM_SENSITIVITY).clamp(MIN_ZOOM, MAX_ZOOM);
        let res = self.resolution();
        self.center.0 = wx - (sx - width / 2.0) * res;
        self.center.1 = wy + (sy - height / 2.0) * res;
        self.clamp();
    }

    fn clamp(&mut self) {
        self.zoom = self.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.center.0 = self.center.0.clamp(-HALF_WORLD_M, HALF_WORLD_M);
        self.center.1 = self.center.1.clamp(-HALF_WORLD_M, HALF_WORLD_M);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn screen_round_trip() {
        let view = MapView::default();
        let (sx, sy) = view.world_to_screen(1_400_000.0, 5_100_000.0, 1200.0, 800.0);
        let (wx, wy) = view.screen_to_world(sx, sy, 1200.0, 800.0);
        assert_close(wx, 1_400_000.0);
        assert_close(wy, 5_100_000.0);
    }

    #[test]
    fn center_maps_to_screen_center() {
        let view = MapView::default();
        let (sx, sy) = view.world_to_screen(view.center.0, view.center.1, 1200.0, 800.0);
        assert_close(sx, 600.0);
        assert_close(sy, 400.0);
    }

    #[test]
    fn pan_moves_center_against_drag_direction() {
        let mut view = MapView::default();
        let before = view.center;
        let res = view.resolution();
        view.pan(100.0, 0.0);
        assert_close(view.center.0, before.0 - 100.0 * res);
        assert_close(view.center.1, before.1);
    }

    #[test]
    fn zoom_at_keeps_cursor_point_fixed() {
        let mut view = MapView::default();
        let (sx, sy) = (300.0, 200.0);
        let before = view.screen_to_world(sx, sy, 1200.0, 800.0);
        view.zoom_at(-240.0, sx, sy, 1200.0, 800.0);
        let after = view.screen_to_world(sx, sy, 1200.0, 800.0);
        assert!(view.zoom > DEFAULT_ZOOM);
        assert_close(after.0, before.0);
        assert_close(after.1, before.1);
    }

    #[test]
    fn zoom_clamps_to_bounds() {
        let mut view = MapView::default();
        view.zoom_at(1e9, 0.0, 0.0, 1200.0, 800.0);
        assert_eq!(view.zoom, MIN_ZOOM);
        view.zoom_at(-1e9, 0.0, 0.0, 1200.0, 800.0);
        assert_eq!(view.zoom, MAX_ZOOM);
    }

    #[test]
    fn new_clamps_out_of_range_positions() {
        let view = MapView::new((1e9, -1e9), 20.0);
        assert_eq!(view.zoom, MAX_ZOOM);
        assert!(view.center.0 <= HALF_WORLD_M);
        assert!(view.center.1 >= -HALF_WORLD_M);
    }
}
