//! Universal Transverse Mercator on the WGS84 ellipsoid.
//!
//! Uses the 6th-order Krüger series (Karney 2011), which stays accurate to
//! well under a millimeter inside a zone.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use super::ProjectionError;
use crate::math::{Geodetic, WGS84_A, WGS84_F};

/// Scale factor on the central meridian.
pub const UTM_K0: f64 = 0.9996;
pub const UTM_FALSE_EASTING: f64 = 500_000.0;
/// Added to northings in the southern hemisphere.
pub const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A UTM zone number (1..=60) with its hemisphere.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UtmZone {
    pub number: u8,
    pub south: bool,
}

impl UtmZone {
    pub fn north(number: u8) -> Result<Self, ProjectionError> {
        Self::new(number, false)
    }

    pub fn new(number: u8, south: bool) -> Result<Self, ProjectionError> {
        if !(1..=60).contains(&number) {
            return Err(ProjectionError::InvalidZone(number.to_string()));
        }
        Ok(Self { number, south })
    }

    pub fn central_meridian_rad(&self) -> f64 {
        (f64::from(self.number) * 6.0 - 183.0).to_radians()
    }
}

impl FromStr for UtmZone {
    type Err = ProjectionError;

    /// Accepts `"10"`, `"10N"`, `"33s"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (digits, south) = match trimmed.chars().last() {
            Some('N' | 'n') => (&trimmed[..trimmed.len() - 1], false),
            Some('S' | 's') => (&trimmed[..trimmed.len() - 1], true),
            _ => (trimmed, false),
        };
        let number: u8 = digits
            .parse()
            .map_err(|_| ProjectionError::InvalidZone(s.to_string()))?;
        Self::new(number, south).map_err(|_| ProjectionError::InvalidZone(s.to_string()))
    }
}

impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, if self.south { 'S' } else { 'N' })
    }
}

struct Series {
    e: f64,
    a_rect: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
}

fn series() -> &'static Series {
    static SERIES: OnceLock<Series> = OnceLock::new();
    SERIES.get_or_init(|| {
        let f = WGS84_F;
        let e = (f * (2.0 - f)).sqrt();
        let n = f / (2.0 - f);
        let (n2, n3, n4, n5, n6) = (n * n, n.powi(3), n.powi(4), n.powi(5), n.powi(6));

        let a_rect = WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let alpha = [
            n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4
                - 127.0 / 288.0 * n5
                + 7891.0 / 37800.0 * n6,
            13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4 + 281.0 / 630.0 * n5
                - 1_983_433.0 / 1_935_360.0 * n6,
            61.0 / 240.0 * n3 - 103.0 / 140.0 * n4 + 15061.0 / 26880.0 * n5
                + 167_603.0 / 181_440.0 * n6,
            49561.0 / 161_280.0 * n4 - 179.0 / 168.0 * n5 + 6_601_661.0 / 7_257_600.0 * n6,
            34729.0 / 80640.0 * n5 - 3_418_889.0 / 1_995_840.0 * n6,
            212_378_941.0 / 319_334_400.0 * n6,
        ];
        let beta = [
            n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4 - 81.0 / 512.0 * n5
                + 96199.0 / 604_800.0 * n6,
            1.0 / 48.0 * n2 + 1.0 / 15.0 * n3 - 437.0 / 1440.0 * n4 + 46.0 / 105.0 * n5
                - 1_118_711.0 / 3_870_720.0 * n6,
            17.0 / 480.0 * n3 - 37.0 / 840.0 * n4 - 209.0 / 4480.0 * n5 + 5569.0 / 90720.0 * n6,
            4397.0 / 161_280.0 * n4 - 11.0 / 504.0 * n5 - 830_251.0 / 7_257_600.0 * n6,
            4583.0 / 161_280.0 * n5 - 108_847.0 / 3_991_680.0 * n6,
            20_648_693.0 / 638_668_800.0 * n6,
        ];

        Series {
            e,
            a_rect,
            alpha,
            beta,
        }
    })
}

/// Conformal latitude tangent from the geodetic latitude tangent.
fn conformal_tan(tau: f64, e: f64) -> f64 {
    let sigma = (e * (e * tau / (1.0 + tau * tau).sqrt()).atanh()).sinh();
    tau * (1.0 + sigma * sigma).sqrt() - sigma * (1.0 + tau * tau).sqrt()
}

/// Easting/northing (meters) to geodetic coordinates. Height is left at zero.
pub fn utm_to_geodetic(easting: f64, northing: f64, zone: UtmZone) -> Geodetic {
    let s = series();
    let x = easting - UTM_FALSE_EASTING;
    let y = if zone.south {
        northing - UTM_FALSE_NORTHING_SOUTH
    } else {
        northing
    };

    let eta = x / (UTM_K0 * s.a_rect);
    let xi = y / (UTM_K0 * s.a_rect);

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, b) in s.beta.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        xi_p -= b * (k * xi).sin() * (k * eta).cosh();
        eta_p -= b * (k * xi).cos() * (k * eta).sinh();
    }

    let sinh_eta = eta_p.sinh();
    let sin_xi = xi_p.sin();
    let cos_xi = xi_p.cos();

    let tau_p = sin_xi / (sinh_eta * sinh_eta + cos_xi * cos_xi).sqrt();

    // Newton-Raphson for the geodetic latitude tangent.
    let e2 = s.e * s.e;
    let mut tau = tau_p;
    for _ in 0..16 {
        let tau_i_p = conformal_tan(tau, s.e);
        let delta = (tau_p - tau_i_p) / (1.0 + tau_i_p * tau_i_p).sqrt()
            * (1.0 + (1.0 - e2) * tau * tau)
            / ((1.0 - e2) * (1.0 + tau * tau).sqrt());
        tau += delta;
        if delta.is_nan() || delta.abs() <= 1e-12 {
            break;
        }
    }

    let lat = tau.atan();
    let lon = sinh_eta.atan2(cos_xi) + zone.central_meridian_rad();
    Geodetic::new(lat, lon, 0.0)
}

/// Geodetic coordinates to `(easting, northing)` in meters.
pub fn geodetic_to_utm(geo: Geodetic, zone: UtmZone) -> (f64, f64) {
    let s = series();
    let lam = geo.lon_rad - zone.central_meridian_rad();

    let tau = geo.lat_rad.tan();
    let tau_p = conformal_tan(tau, s.e);

    let cos_lam = lam.cos();
    let xi_p = tau_p.atan2(cos_lam);
    let eta_p = (lam.sin() / (tau_p * tau_p + cos_lam * cos_lam).sqrt()).asinh();

    let mut xi = xi_p;
    let mut eta = eta_p;
    for (j, a) in s.alpha.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
        eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
    }

    let easting = UTM_K0 * s.a_rect * eta + UTM_FALSE_EASTING;
    let mut northing = UTM_K0 * s.a_rect * xi;
    if zone.south {
        northing += UTM_FALSE_NORTHING_SOUTH;
    }
    (easting, northing)
}

#[cfg(test)]
mod tests {
    use super::{UtmZone, geodetic_to_utm, utm_to_geodetic};
    use crate::math::Geodetic;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn parses_zone_strings() {
        assert_eq!("10".parse::<UtmZone>().unwrap(), UtmZone { number: 10, south: false });
        assert_eq!("56S".parse::<UtmZone>().unwrap(), UtmZone { number: 56, south: true });
        assert_eq!(" 47n ".parse::<UtmZone>().unwrap(), UtmZone { number: 47, south: false });
        assert!("0".parse::<UtmZone>().is_err());
        assert!("61".parse::<UtmZone>().is_err());
        assert!("ten".parse::<UtmZone>().is_err());
        assert!("".parse::<UtmZone>().is_err());
    }

    fn meridian(zone: u8) -> f64 {
        UtmZone::north(zone).unwrap().central_meridian_rad().to_degrees()
    }

    #[test]
    fn central_meridians() {
        assert_close(meridian(10), -123.0, 1e-12);
        assert_close(meridian(47), 99.0, 1e-12);
        assert_close(meridian(1), -177.0, 1e-12);
    }

    #[test]
    fn san_francisco_reference_point() {
        let zone = UtmZone::north(10).unwrap();
        let (e, n) = geodetic_to_utm(Geodetic::from_degrees(-122.4194, 37.7749, 0.0), zone);
        assert_close(e, 551_130.768, 0.01);
        assert_close(n, 4_180_998.881, 0.01);
    }

    #[test]
    fn false_easting_sits_on_central_meridian() {
        let geo = utm_to_geodetic(500_000.0, 4_183_000.0, UtmZone::north(10).unwrap());
        assert_close(geo.lon_deg(), -123.0, 1e-9);
        assert_close(geo.lat_deg(), 37.794_366_9, 1e-6);
    }

    #[test]
    fn southern_hemisphere_round_trip() {
        let zone: UtmZone = "56S".parse().unwrap();
        let sydney = Geodetic::from_degrees(151.2093, -33.8688, 0.0);
        let (e, n) = geodetic_to_utm(sydney, zone);
        assert_close(e, 334_368.634, 0.01);
        assert_close(n, 6_250_948.345, 0.01);
        let back = utm_to_geodetic(e, n, zone);
        assert_close(back.lat_deg(), -33.8688, 1e-9);
        assert_close(back.lon_deg(), 151.2093, 1e-9);
    }
}
