//! Spherical ("pseudo") Mercator used by web tile maps (EPSG:3857).

use super::geodesy::WGS84_A;

/// Latitude limit where the Web Mercator square ends.
pub const MAX_LATITUDE_DEG: f64 = 85.051_128_779_806_59;

/// Half the width of the projected world (meters).
pub const HALF_WORLD_M: f64 = std::f64::consts::PI * WGS84_A;

/// Projects geographic degrees to Web Mercator meters.
///
/// Latitudes beyond [`MAX_LATITUDE_DEG`] are clamped so poles stay finite.
pub fn lon_lat_to_mercator(lon_deg: f64, lat_deg: f64) -> [f64; 2] {
    let lat = lat_deg.clamp(-MAX_LATITUDE_DEG, MAX_LATITUDE_DEG);
    let x = WGS84_A * lon_deg.to_radians();
    let y = WGS84_A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    [x, y]
}

/// Inverse of [`lon_lat_to_mercator`].
pub fn mercator_to_lon_lat(x: f64, y: f64) -> [f64; 2] {
    let lon = (x / WGS84_A).to_degrees();
    let lat = (y / WGS84_A).sinh().atan().to_degrees();
    [lon, lat]
}

#[cfg(test)]
mod tests {
    use super::{HALF_WORLD_M, MAX_LATITUDE_DEG, lon_lat_to_mercator, mercator_to_lon_lat};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_maps_to_origin() {
        let [x, y] = lon_lat_to_mercator(0.0, 0.0);
        assert_close(x, 0.0, 1e-9);
        assert_close(y, 0.0, 1e-9);
    }

    #[test]
    fn antimeridian_is_world_edge() {
        let [x, _] = lon_lat_to_mercator(180.0, 0.0);
        assert_close(x, 20_037_508.342_789_244, 1e-6);
        assert_close(x, HALF_WORLD_M, 1e-6);
    }

    #[test]
    fn max_latitude_is_square() {
        let [_, y] = lon_lat_to_mercator(0.0, MAX_LATITUDE_DEG);
        assert_close(y, HALF_WORLD_M, 1e-3);
    }

    #[test]
    fn poles_are_clamped() {
        let [_, y] = lon_lat_to_mercator(0.0, 90.0);
        assert!(y.is_finite());
    }

    #[test]
    fn round_trip_warsaw() {
        let [x, y] = lon_lat_to_mercator(21.0122, 52.2297);
        let [lon, lat] = mercator_to_lon_lat(x, y);
        assert_close(lon, 21.0122, 1e-9);
        assert_close(lat, 52.2297, 1e-9);
    }
}
