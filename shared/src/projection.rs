use std::f64::consts::PI;

/// WGS84 / EPSG:3857 spherical radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Half the extent of the EPSG:3857 plane (meters from origin to edge).
pub const HALF_WORLD_M: f64 = PI * EARTH_RADIUS_M;

/// Latitude at which the square web-mercator plane is cut off.
pub const MAX_LATITUDE: f64 = 85.051129;

/// Resolution (meters per pixel) of a 256px tile covering the world at zoom 0.
pub const BASE_RESOLUTION: f64 = 2.0 * HALF_WORLD_M / 256.0;

/// Project geographic lon/lat degrees (EPSG:4326) to EPSG:3857 meters.
/// Latitude is clamped to the projection's valid range.
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Inverse of [`lon_lat_to_mercator`].
pub fn mercator_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// Map resolution (projection meters per screen pixel) at a zoom level.
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    BASE_RESOLUTION / 2f64.powf(zoom)
}

/// Zoom level whose resolution equals `resolution`.
pub fn zoom_for_resolution(resolution: f64) -> f64 {
    (BASE_RESOLUTION / resolution).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn projects_rome() {
        let (x, y) = lon_lat_to_mercator(12.4839, 41.89474);
        assert_close(x, 1_389_701.4, 1.0);
        assert_close(y, 5_145_225.0, 1.0);
    }

    #[test]
    fn round_trips_through_projection() {
        let (x, y) = lon_lat_to_mercator(12.4839, 41.89474);
        let (lon, lat) = mercator_to_lon_lat(x, y);
        assert_close(lon, 12.4839, 1e-9);
        assert_close(lat, 41.89474, 1e-9);
    }

    #[test]
    fn clamps_polar_latitudes() {
        let (_, y_pole) = lon_lat_to_mercator(0.0, 90.0);
        let (_, y_edge) = lon_lat_to_mercator(0.0, MAX_LATITUDE);
        assert_close(y_pole, y_edge, 1e-6);
        assert_close(y_edge, HALF_WORLD_M, 1.0);
    }

    #[test]
    fn zoom_resolution_round_trip() {
        assert_close(resolution_for_zoom(0.0), 156_543.033_928, 1e-6);
        for zoom in [1.0, 6.0, 11.0] {
            assert_close(zoom_for_resolution(resolution_for_zoom(zoom)), zoom, 1e-9);
        }
    }

    #[test]
    fn each_zoom_step_halves_resolution() {
        let coarse = resolution_for_zoom(5.0);
        let fine = resolution_for_zoom(6.0);
        assert_close(coarse / fine, 2.0, 1e-12);
    }
}
