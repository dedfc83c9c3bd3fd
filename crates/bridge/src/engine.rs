//! Capabilities the bridge consumes from the two engines.

use foundation::bounds::Aabb3;
use foundation::math::{Ecef, Geodetic, Mat4, Vec3, geodetic_to_ecef};

use crate::config::{Background, ControlMode};

/// Snapshot of the point-cloud engine's active camera.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PceCamera {
    /// Camera-to-world transform in the local frame.
    pub world: Mat4,
    /// Vertical field of view.
    pub fov_deg: f64,
    /// Viewport width / height.
    pub aspect: f64,
}

pub trait PointCloudEngine {
    fn set_fov(&mut self, degrees: f64);
    fn set_point_budget(&mut self, points: u64);
    fn set_background(&mut self, background: Option<Background>);
    fn set_edl_enabled(&mut self, enabled: bool);
    fn set_edl_radius(&mut self, radius: f64);
    fn set_edl_strength(&mut self, strength: f64);
    fn set_controls(&mut self, mode: ControlMode);
    fn set_description(&mut self, html: &str);
    fn load_settings_from_url(&mut self);
    /// Builds the engine's side panel into the element with `container_id`.
    fn load_side_panel(&mut self, container_id: &str);
    fn fit_to_screen(&mut self);

    fn active_camera(&self) -> Option<PceCamera>;
    /// Orbit pivot of the navigation controls.
    fn pivot(&self) -> Option<Vec3>;
    /// World-space bounds of every loaded point cloud.
    fn point_cloud_bounds(&self) -> Vec<Aabb3>;
}

pub trait GlobeEngine {
    fn set_view(&mut self, position: Ecef, direction: Vec3, up: Vec3);
    /// Applies a horizontal FOV; false when the frustum is not perspective.
    fn set_perspective_fov(&mut self, fov_rad: f64) -> bool;
    fn render(&mut self);
    fn is_destroyed(&self) -> bool;
    fn destroy(&mut self);

    fn cartesian_from_degrees(&self, lon_deg: f64, lat_deg: f64, height: f64) -> Ecef {
        geodetic_to_ecef(Geodetic::from_degrees(lon_deg, lat_deg, height))
    }
}
