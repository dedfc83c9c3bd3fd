//! Construction of the point-cloud viewer once assets are ready.

use assets::BootstrapStatus;
use tracing::{debug, info};

use crate::config::{SIDEBAR_CONTAINER_ID, ViewerConfig};
use crate::engine::PointCloudEngine;
use crate::error::{BridgeError, Engine};
use crate::host::PceHost;
use crate::registry::Registry;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    Created,
    AlreadyMounted,
    /// Preconditions not met yet; try again later.
    Waiting,
}

pub fn apply_viewer_config(viewer: &mut impl PointCloudEngine, config: &ViewerConfig) {
    viewer.set_fov(config.fov);
    viewer.set_point_budget(config.effective_point_budget());
    viewer.set_edl_enabled(config.edl_enabled);
    viewer.set_edl_radius(config.edl_radius);
    viewer.set_edl_strength(config.edl_strength);
    viewer.set_background(config.background);
    viewer.load_settings_from_url();
    viewer.set_controls(config.control_mode);
    viewer.set_description("");
    if config.show_sidebar {
        viewer.load_side_panel(SIDEBAR_CONTAINER_ID);
    }
}

/// Creates and publishes the viewer. A no-op while assets are not `Ready` or
/// when a viewer is already published.
pub fn mount_viewer<H: PceHost, G>(
    host: &mut H,
    registry: &mut Registry<H::Viewer, G>,
    config: &ViewerConfig,
) -> Result<MountOutcome, BridgeError> {
    if registry.status() != BootstrapStatus::Ready {
        return Ok(MountOutcome::Waiting);
    }
    if registry.viewer().is_some() {
        return Ok(MountOutcome::AlreadyMounted);
    }
    let container_id = registry.container_id().to_string();
    if !host.container_exists(&container_id) {
        return Err(BridgeError::ContainerMissing {
            engine: Engine::PointCloud,
            container_id,
        });
    }

    debug!(container = %container_id, "creating point-cloud viewer");
    let mut viewer = host
        .create_viewer(&container_id)
        .map_err(|reason| BridgeError::EngineInit {
            engine: Engine::PointCloud,
            reason,
        })?;
    apply_viewer_config(&mut viewer, config);
    registry.set_viewer(viewer);
    info!(container = %container_id, "point-cloud viewer published");
    Ok(MountOutcome::Created)
}

pub fn teardown_viewer<H: PceHost, G>(host: &mut H, registry: &mut Registry<H::Viewer, G>) {
    if registry.take_viewer().is_some() {
        let container_id = registry.container_id().to_string();
        host.clear_container(&container_id);
        debug!(container = %container_id, "point-cloud viewer torn down");
    }
}
