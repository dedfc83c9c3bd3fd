//! Local ↔ geodetic transforms for the supported projection modes.
//!
//! `resolve` turns a [`ProjectionConfig`] into a [`Transform`]. Every
//! `forward` result is validated: a non-finite input or output, or a
//! longitude/latitude outside [-180,180]×[-90,90], yields [`Unprojectable`]
//! rather than a numeric value.

pub mod anchor;
pub mod mercator;
pub mod utm;

use serde::{Deserialize, Serialize};

use crate::bounds::Aabb3;
use crate::math::{Geodetic, Vec3};

pub use anchor::*;
pub use mercator::*;
pub use utm::*;

/// Named coordinate system of the point-cloud local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProjectionConfig {
    Utm {
        zone: String,
    },
    Mercator,
    FixedAnchor {
        longitude: f64,
        latitude: f64,
        height: f64,
    },
}

impl ProjectionConfig {
    pub fn utm(zone: impl Into<String>) -> Self {
        ProjectionConfig::Utm { zone: zone.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProjectionConfig::Utm { .. } => "utm",
            ProjectionConfig::Mercator => "mercator",
            ProjectionConfig::FixedAnchor { .. } => "fixedAnchor",
        }
    }
}

/// Malformed projection configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("invalid UTM zone {0:?} (expected 1-60 with optional N/S)")]
    InvalidZone(String),
    #[error("invalid anchor: longitude {longitude}, latitude {latitude}, height {height}")]
    InvalidAnchor {
        longitude: f64,
        latitude: f64,
        height: f64,
    },
    #[error("vertical offset must be finite, got {0}")]
    InvalidOffset(f64),
}

/// Why a point could not be projected this time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unprojectable {
    #[error("coordinate is not finite")]
    NonFinite,
    #[error("longitude/latitude out of range")]
    OutOfRange,
    #[error("no local reference captured yet")]
    NoReference,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Utm { zone: UtmZone, vertical_offset: f64 },
    Mercator { vertical_offset: f64 },
    FixedAnchor(AnchorTransform),
}

pub fn resolve(
    config: &ProjectionConfig,
    vertical_offset: f64,
) -> Result<Transform, ProjectionError> {
    if !vertical_offset.is_finite() {
        return Err(ProjectionError::InvalidOffset(vertical_offset));
    }
    match config {
        ProjectionConfig::Utm { zone } => Ok(Transform::Utm {
            zone: zone.parse()?,
            vertical_offset,
        }),
        ProjectionConfig::Mercator => Ok(Transform::Mercator { vertical_offset }),
        ProjectionConfig::FixedAnchor {
            longitude,
            latitude,
            height,
        } => {
            let (longitude, latitude, height) = (*longitude, *latitude, *height);
            let anchor = Geodetic::from_degrees(longitude, latitude, height);
            // Poles collapse the longitude scale to zero.
            if !anchor.is_finite() || !anchor.in_range() || latitude.abs() >= 90.0 {
                return Err(ProjectionError::InvalidAnchor {
                    longitude,
                    latitude,
                    height,
                });
            }
            Ok(Transform::FixedAnchor(AnchorTransform::new(anchor)))
        }
    }
}

fn validated(geo: Geodetic) -> Result<Geodetic, Unprojectable> {
    if !geo.is_finite() {
        return Err(Unprojectable::NonFinite);
    }
    if !geo.in_range() {
        return Err(Unprojectable::OutOfRange);
    }
    Ok(geo)
}

impl Transform {
    /// Local point to geodetic position.
    pub fn forward(&self, local: Vec3) -> Result<Geodetic, Unprojectable> {
        if !local.is_finite() {
            return Err(Unprojectable::NonFinite);
        }
        let geo = match self {
            Transform::Utm {
                zone,
                vertical_offset,
            } => {
                let mut geo = utm_to_geodetic(local.x, local.y, *zone);
                geo.alt_m = local.z + vertical_offset;
                geo
            }
            Transform::Mercator { vertical_offset } => {
                let mut geo = mercator_to_geodetic(local.x, local.y);
                geo.alt_m = local.z + vertical_offset;
                geo
            }
            Transform::FixedAnchor(anchor) => {
                anchor.forward(local).ok_or(Unprojectable::NoReference)?
            }
        };
        validated(geo)
    }

    /// Geodetic position back to the local frame.
    pub fn inverse(&self, geo: Geodetic) -> Result<Vec3, Unprojectable> {
        let geo = validated(geo)?;
        let local = match self {
            Transform::Utm {
                zone,
                vertical_offset,
            } => {
                let (e, n) = geodetic_to_utm(geo, *zone);
                Vec3::new(e, n, geo.alt_m - vertical_offset)
            }
            Transform::Mercator { vertical_offset } => {
                let (x, y) = geodetic_to_mercator(geo);
                Vec3::new(x, y, geo.alt_m - vertical_offset)
            }
            Transform::FixedAnchor(anchor) => {
                anchor.inverse(geo).ok_or(Unprojectable::NoReference)?
            }
        };
        if !local.is_finite() {
            return Err(Unprojectable::NonFinite);
        }
        Ok(local)
    }

    /// Feed dataset bounds to modes that derive their local reference from data.
    ///
    /// Returns `true` when this call captured a reference.
    pub fn observe_bounds(&mut self, bounds: &Aabb3) -> bool {
        match self {
            Transform::FixedAnchor(anchor) => anchor.observe_bounds(bounds),
            _ => false,
        }
    }

    pub fn needs_reference(&self) -> bool {
        matches!(self, Transform::FixedAnchor(a) if a.reference().is_none())
    }

    pub fn reference(&self) -> Option<Vec3> {
        match self {
            Transform::FixedAnchor(a) => a.reference(),
            _ => None,
        }
    }
}
