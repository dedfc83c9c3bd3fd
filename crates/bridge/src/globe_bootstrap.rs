//! Construction of the globe once the viewer exists.

use assets::BootstrapStatus;
use foundation::math::{Ecef, Vec3};
use tracing::{debug, info};

use crate::config::{GeoPosition, GlobeConfig};
use crate::engine::GlobeEngine;
use crate::error::{BridgeError, Engine};
use crate::host::{GlobeHost, GlobeOptions};
use crate::pce_bootstrap::MountOutcome;
use crate::registry::{Registry, RegistryError};

/// Straight-down view over `position` with north up.
pub fn initial_view(globe: &impl GlobeEngine, position: GeoPosition) -> (Ecef, Vec3, Vec3) {
    let destination =
        globe.cartesian_from_degrees(position.longitude, position.latitude, position.height);
    let (sin_lat, cos_lat) = position.latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = position.longitude.to_radians().sin_cos();
    let down = Vec3::new(-cos_lat * cos_lon, -cos_lat * sin_lon, -sin_lat);
    let north = Vec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
    (destination, down, north)
}

/// Creates and publishes the globe. Waits until the viewer is published.
pub fn mount_globe<H: GlobeHost, P>(
    host: &mut H,
    registry: &mut Registry<P, H::Globe>,
    config: &GlobeConfig,
    base_url: &str,
) -> Result<MountOutcome, BridgeError> {
    if registry.status() != BootstrapStatus::Ready || registry.viewer().is_none() {
        return Ok(MountOutcome::Waiting);
    }
    if registry.globe().is_some() {
        return Ok(MountOutcome::AlreadyMounted);
    }
    if registry.projection().is_none() {
        return Err(RegistryError::GlobeWithoutProjection.into());
    }
    let container_id = crate::config::globe_container_id(registry.container_id());
    if !host.container_exists(&container_id) {
        return Err(BridgeError::ContainerMissing {
            engine: Engine::Globe,
            container_id,
        });
    }

    let options = GlobeOptions::new(config.imagery_source.provider(), base_url);
    debug!(container = %container_id, imagery = options.imagery.url, "creating globe");
    host.patch_canvas();
    let mut globe = match host.create_globe(&container_id, &options) {
        Ok(globe) => globe,
        Err(reason) => {
            host.unpatch_canvas();
            return Err(BridgeError::EngineInit {
                engine: Engine::Globe,
                reason,
            });
        }
    };
    let (destination, direction, up) = initial_view(&globe, config.initial_position);
    globe.set_view(destination, direction, up);
    registry.set_globe(globe)?;
    info!(container = %container_id, "globe published");
    Ok(MountOutcome::Created)
}

pub fn teardown_globe<H: GlobeHost, P>(host: &mut H, registry: &mut Registry<P, H::Globe>) {
    if let Some(mut globe) = registry.take_globe() {
        if !globe.is_destroyed() {
            globe.destroy();
        }
        host.unpatch_canvas();
        let container_id = crate::config::globe_container_id(registry.container_id());
        host.clear_container(&container_id);
        debug!(container = %container_id, "globe torn down");
    }
}
