//! In-memory engines and host for unit tests.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeSet;
use std::rc::Rc;

use assets::{AssetHost, AssetKind, AssetState, CESIUM_GLOBAL, POTREE_GLOBAL, SharedAssetCache};
use foundation::bounds::Aabb3;
use foundation::math::{Ecef, Vec3};
use runtime::{FrameHandle, FrameScheduler};

use crate::config::{Background, ControlMode};
use crate::engine::{GlobeEngine, PceCamera, PointCloudEngine};
use crate::host::{ContainerHost, GlobeHost, GlobeOptions, PceHost};

#[derive(Debug, Default)]
pub struct FakeViewer {
    pub calls: Vec<String>,
    pub camera: Option<PceCamera>,
    pub pivot: Option<Vec3>,
    pub bounds: Vec<Aabb3>,
}

impl PointCloudEngine for FakeViewer {
    fn set_fov(&mut self, degrees: f64) {
        self.calls.push(format!("fov {degrees}"));
    }

    fn set_point_budget(&mut self, points: u64) {
        self.calls.push(format!("budget {points}"));
    }

    fn set_background(&mut self, background: Option<Background>) {
        let name = background.map_or("none", Background::as_str);
        self.calls.push(format!("background {name}"));
    }

    fn set_edl_enabled(&mut self, enabled: bool) {
        self.calls.push(format!("edl {enabled}"));
    }

    fn set_edl_radius(&mut self, radius: f64) {
        self.calls.push(format!("edl_radius {radius}"));
    }

    fn set_edl_strength(&mut self, strength: f64) {
        self.calls.push(format!("edl_strength {strength}"));
    }

    fn set_controls(&mut self, mode: ControlMode) {
        self.calls.push(format!("controls {}", mode.as_str()));
    }

    fn set_description(&mut self, html: &str) {
        self.calls.push(format!("description {html}"));
    }

    fn load_settings_from_url(&mut self) {
        self.calls.push("url_settings".into());
    }

    fn load_side_panel(&mut self, container_id: &str) {
        self.calls.push(format!("side_panel {container_id}"));
    }

    fn fit_to_screen(&mut self) {
        self.calls.push("fit".into());
    }

    fn active_camera(&self) -> Option<PceCamera> {
        self.camera
    }

    fn pivot(&self) -> Option<Vec3> {
        self.pivot
    }

    fn point_cloud_bounds(&self) -> Vec<Aabb3> {
        self.bounds.clone()
    }
}

#[derive(Debug)]
pub struct FakeGlobe {
    pub views: Vec<(Ecef, Vec3, Vec3)>,
    pub fovs: Vec<f64>,
    pub perspective: bool,
    pub renders: Rc<Cell<u32>>,
    destroyed: Rc<Cell<bool>>,
}

impl Default for FakeGlobe {
    fn default() -> Self {
        Self {
            views: Vec::new(),
            fovs: Vec::new(),
            perspective: true,
            renders: Rc::new(Cell::new(0)),
            destroyed: Rc::new(Cell::new(false)),
        }
    }
}

impl FakeGlobe {
    /// Outlives the globe, so tests can check teardown.
    pub fn destroyed_flag(&self) -> Rc<Cell<bool>> {
        self.destroyed.clone()
    }
}

impl GlobeEngine for FakeGlobe {
    fn set_view(&mut self, position: Ecef, direction: Vec3, up: Vec3) {
        self.views.push((position, direction, up));
    }

    fn set_perspective_fov(&mut self, fov_rad: f64) -> bool {
        if self.perspective {
            self.fovs.push(fov_rad);
        }
        self.perspective
    }

    fn render(&mut self) {
        self.renders.set(self.renders.get() + 1);
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    fn destroy(&mut self) {
        self.destroyed.set(true);
    }
}

#[derive(Debug, Default)]
pub struct World {
    pub requested: Vec<(AssetKind, String)>,
    pub globals: BTreeSet<String>,
    pub containers: BTreeSet<String>,
    pub cleared: Vec<String>,
    pub viewers_created: u32,
    pub viewer_failures: u32,
    pub globes_created: u32,
    pub globe_failures: u32,
    pub globe_options: Vec<GlobeOptions>,
    pub canvas_patched: bool,
    pub live_frames: Vec<FrameHandle>,
    pub cancelled: Vec<FrameHandle>,
    next_frame: u64,
}

impl World {
    /// The host delivered `handle`; it is no longer outstanding.
    pub fn fire(&mut self, handle: FrameHandle) {
        self.live_frames.retain(|h| *h != handle);
    }
}

/// Page, engines and animation-frame source in one shared handle. Clones
/// share the same world, like sessions sharing one document.
#[derive(Debug, Clone, Default)]
pub struct FakeHost(Rc<RefCell<World>>);

impl FakeHost {
    /// A page with the given containers whose engine scripts define their globals.
    pub fn with_containers(ids: &[&str]) -> Self {
        let host = FakeHost::default();
        {
            let mut w = host.world_mut();
            w.containers = ids.iter().map(|s| s.to_string()).collect();
            w.globals = [POTREE_GLOBAL, CESIUM_GLOBAL].into_iter().map(String::from).collect();
        }
        host
    }

    pub fn world(&self) -> Ref<'_, World> {
        self.0.borrow()
    }

    pub fn world_mut(&self) -> RefMut<'_, World> {
        self.0.borrow_mut()
    }

    pub fn requested(&self, kind: AssetKind) -> Vec<String> {
        self.world()
            .requested
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, url)| url.clone())
            .collect()
    }

    /// Completes every in-flight request; returns how many completed.
    pub fn settle(&self, cache: &SharedAssetCache) -> usize {
        let urls: Vec<String> = self.world().requested.iter().map(|(_, u)| u.clone()).collect();
        let mut cache = cache.borrow_mut();
        let mut n = 0;
        for url in urls {
            if cache.state(&url) == Some(&AssetState::InFlight) {
                cache.complete(&url, Ok(()));
                n += 1;
            }
        }
        n
    }
}

impl AssetHost for FakeHost {
    fn request_script(&mut self, url: &str) {
        self.world_mut().requested.push((AssetKind::Script, url.to_string()));
    }

    fn request_stylesheet(&mut self, url: &str) {
        self.world_mut().requested.push((AssetKind::Stylesheet, url.to_string()));
    }

    fn global_defined(&self, name: &str) -> bool {
        self.world().globals.contains(name)
    }
}

impl ContainerHost for FakeHost {
    fn container_exists(&self, id: &str) -> bool {
        self.world().containers.contains(id)
    }

    fn clear_container(&mut self, id: &str) {
        self.world_mut().cleared.push(id.to_string());
    }
}

impl PceHost for FakeHost {
    type Viewer = FakeViewer;

    fn create_viewer(&mut self, _container_id: &str) -> Result<FakeViewer, String> {
        let mut w = self.world_mut();
        if w.viewer_failures > 0 {
            w.viewer_failures -= 1;
            return Err("WebGL context lost".into());
        }
        w.viewers_created += 1;
        Ok(FakeViewer::default())
    }
}

impl GlobeHost for FakeHost {
    type Globe = FakeGlobe;

    fn create_globe(
        &mut self,
        _container_id: &str,
        options: &GlobeOptions,
    ) -> Result<FakeGlobe, String> {
        let mut w = self.world_mut();
        w.globe_options.push(options.clone());
        if w.globe_failures > 0 {
            w.globe_failures -= 1;
            return Err("no WebGL".into());
        }
        w.globes_created += 1;
        Ok(FakeGlobe::default())
    }

    fn patch_canvas(&mut self) {
        self.world_mut().canvas_patched = true;
    }

    fn unpatch_canvas(&mut self) {
        self.world_mut().canvas_patched = false;
    }
}

impl FrameScheduler for FakeHost {
    fn request_frame(&mut self) -> FrameHandle {
        let mut w = self.world_mut();
        w.next_frame += 1;
        let handle = FrameHandle(w.next_frame);
        w.live_frames.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let mut w = self.world_mut();
        w.live_frames.retain(|h| *h != handle);
        w.cancelled.push(handle);
    }
}
