//! Flat-earth offsets around a fixed geodetic anchor.
//!
//! Local coordinates have an arbitrary origin that is only known once data
//! loads, so the local reference point is captured lazily from the first
//! dataset bounds. The approximation is meant for offsets of a few
//! kilometers; the error grows with distance from the anchor.

use crate::bounds::Aabb3;
use crate::math::{Geodetic, Vec3};

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AnchorTransform {
    anchor: Geodetic,
    reference: Option<Vec3>,
}

impl AnchorTransform {
    pub fn new(anchor: Geodetic) -> Self {
        Self {
            anchor,
            reference: None,
        }
    }

    pub fn with_reference(anchor: Geodetic, reference: Vec3) -> Self {
        Self {
            anchor,
            reference: Some(reference),
        }
    }

    pub fn anchor(&self) -> Geodetic {
        self.anchor
    }

    pub fn reference(&self) -> Option<Vec3> {
        self.reference
    }

    /// Capture the local reference from dataset bounds: center in x/y, floor in z.
    ///
    /// Only the first usable box is taken. Returns `true` when it was captured now.
    pub fn observe_bounds(&mut self, bounds: &Aabb3) -> bool {
        if self.reference.is_some() || bounds.is_empty() || !bounds.is_finite() {
            return false;
        }
        let c = bounds.center();
        self.reference = Some(Vec3::new(c.x, c.y, bounds.min[2]));
        true
    }

    fn meters_per_degree_lon(&self) -> f64 {
        METERS_PER_DEGREE * self.anchor.lat_rad.cos()
    }

    pub fn forward(&self, local: Vec3) -> Option<Geodetic> {
        let reference = self.reference?;
        let d = local - reference;
        let lon = self.anchor.lon_deg() + d.x / self.meters_per_degree_lon();
        let lat = self.anchor.lat_deg() + d.y / METERS_PER_DEGREE;
        Some(Geodetic::from_degrees(lon, lat, self.anchor.alt_m + d.z))
    }

    pub fn inverse(&self, geo: Geodetic) -> Option<Vec3> {
        let reference = self.reference?;
        let dx = (geo.lon_deg() - self.anchor.lon_deg()) * self.meters_per_degree_lon();
        let dy = (geo.lat_deg() - self.anchor.lat_deg()) * METERS_PER_DEGREE;
        let dz = geo.alt_m - self.anchor.alt_m;
        Some(reference + Vec3::new(dx, dy, dz))
    }
}
