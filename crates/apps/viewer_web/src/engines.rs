//! Potree and Cesium objects behind the bridge engine traits.

use bridge::{Background, ControlMode, GlobeEngine, PceCamera, PointCloudEngine};
use foundation::bounds::Aabb3;
use foundation::math::{Ecef, Mat4, Vec3};
use wasm_bindgen::prelude::*;

use crate::glue;

pub struct PotreeViewer {
    handle: JsValue,
}

impl PotreeViewer {
    pub fn new(handle: JsValue) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &JsValue {
        &self.handle
    }

    fn call(&self, method: &str, args: &[JsValue]) {
        if let Err(err) = glue::invoke(&self.handle, method, args) {
            glue::warn(&format!("Potree.Viewer.{method} failed: {}", glue::error_message(&err)));
        }
    }
}

impl PointCloudEngine for PotreeViewer {
    fn set_fov(&mut self, degrees: f64) {
        self.call("setFOV", &[degrees.into()]);
    }

    fn set_point_budget(&mut self, points: u64) {
        self.call("setPointBudget", &[(points as f64).into()]);
    }

    fn set_background(&mut self, background: Option<Background>) {
        let value = background.map_or(JsValue::NULL, |b| b.as_str().into());
        self.call("setBackground", &[value]);
    }

    fn set_edl_enabled(&mut self, enabled: bool) {
        self.call("setEDLEnabled", &[enabled.into()]);
    }

    fn set_edl_radius(&mut self, radius: f64) {
        self.call("setEDLRadius", &[radius.into()]);
    }

    fn set_edl_strength(&mut self, strength: f64) {
        self.call("setEDLStrength", &[strength.into()]);
    }

    fn set_controls(&mut self, mode: ControlMode) {
        let field = match mode {
            ControlMode::Orbit => "orbitControls",
            ControlMode::Earth => "earthControls",
            ControlMode::FirstPerson => "fpControls",
        };
        match js_sys::Reflect::get(&self.handle, &field.into()) {
            Ok(controls) if !controls.is_undefined() => self.call("setControls", &[controls]),
            _ => glue::warn(&format!("Potree.Viewer has no {field}")),
        }
    }

    fn set_description(&mut self, html: &str) {
        self.call("setDescription", &[html.into()]);
    }

    fn load_settings_from_url(&mut self) {
        self.call("loadSettingsFromURL", &[]);
    }

    // Potree's GUI loader looks the sidebar container up by its fixed id.
    fn load_side_panel(&mut self, _container_id: &str) {
        let done = js_sys::Function::new_no_args("");
        self.call("loadGUI", &[done.into()]);
    }

    fn fit_to_screen(&mut self) {
        self.call("fitToScreen", &[]);
    }

    fn active_camera(&self) -> Option<PceCamera> {
        let values = glue::bridge_potree_camera(&self.handle).ok().and_then(glue::read_f64s)?;
        let elements: [f64; 16] = values.get(..16)?.try_into().ok()?;
        Some(PceCamera {
            world: Mat4::from_column_major(elements),
            fov_deg: *values.get(16)?,
            aspect: *values.get(17)?,
        })
    }

    fn pivot(&self) -> Option<Vec3> {
        let p = glue::bridge_potree_pivot(&self.handle).ok().and_then(glue::read_f64s)?;
        match p[..] {
            [x, y, z] => Some(Vec3::new(x, y, z)),
            _ => None,
        }
    }

    fn point_cloud_bounds(&self) -> Vec<Aabb3> {
        let values = glue::bridge_potree_bounds(&self.handle)
            .ok()
            .and_then(glue::read_f64s)
            .unwrap_or_default();
        values
            .chunks_exact(6)
            .map(|b| Aabb3::new([b[0], b[1], b[2]], [b[3], b[4], b[5]]))
            .collect()
    }
}

pub struct CesiumGlobe {
    handle: JsValue,
}

impl CesiumGlobe {
    pub fn new(handle: JsValue) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &JsValue {
        &self.handle
    }
}

impl GlobeEngine for CesiumGlobe {
    fn set_view(&mut self, position: Ecef, direction: Vec3, up: Vec3) {
        let result = glue::bridge_cesium_set_view(
            &self.handle,
            &position.as_array(),
            &direction.as_array(),
            &up.as_array(),
        );
        if let Err(err) = result {
            glue::warn(&format!("Cesium camera.setView failed: {}", glue::error_message(&err)));
        }
    }

    fn set_perspective_fov(&mut self, fov_rad: f64) -> bool {
        if !fov_rad.is_finite() {
            return false;
        }
        glue::bridge_cesium_set_fov(&self.handle, fov_rad).unwrap_or(false)
    }

    fn render(&mut self) {
        if let Err(err) = glue::invoke(&self.handle, "render", &[]) {
            glue::warn(&format!("Cesium render failed: {}", glue::error_message(&err)));
        }
    }

    fn is_destroyed(&self) -> bool {
        glue::invoke(&self.handle, "isDestroyed", &[])
            .map(|v| v.as_bool().unwrap_or(true))
            .unwrap_or(true)
    }

    fn destroy(&mut self) {
        if let Err(err) = glue::invoke(&self.handle, "destroy", &[]) {
            glue::warn(&format!("Cesium destroy failed: {}", glue::error_message(&err)));
        }
    }
}
