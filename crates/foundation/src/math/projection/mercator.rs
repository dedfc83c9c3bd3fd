//! Spherical Web Mercator (EPSG:3857).

use crate::math::{Geodetic, WGS84_A};

/// Sphere radius used by Web Mercator.
pub const MERCATOR_RADIUS: f64 = WGS84_A;

/// Planar Web Mercator meters to geodetic coordinates. Height is left at zero.
pub fn mercator_to_geodetic(x: f64, y: f64) -> Geodetic {
    let lon = x / MERCATOR_RADIUS;
    let lat = 2.0 * (y / MERCATOR_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2;
    Geodetic::new(lat, lon, 0.0)
}

/// Geodetic coordinates to planar Web Mercator meters.
pub fn geodetic_to_mercator(geo: Geodetic) -> (f64, f64) {
    let x = MERCATOR_RADIUS * geo.lon_rad;
    let y = MERCATOR_RADIUS * (std::f64::consts::FRAC_PI_4 + 0.5 * geo.lat_rad).tan().ln();
    (x, y)
}
