//! Per-frame hand-off of the point-cloud camera to the globe.
//!
//! Each tick reads the viewer's camera in its local frame, projects the eye,
//! the orbit pivot and an up probe to geodetic positions, converts them to
//! the globe's Cartesian frame and sets the globe camera from the resulting
//! direction/up vectors. Whatever happens, the globe renders exactly once
//! per tick; a frame that cannot be projected keeps the previous view.

use foundation::math::projection::{Transform, Unprojectable};
use foundation::math::{Ecef, Geodetic, Vec3};
use runtime::{Frame, FrameHandle, FrameLoop, FrameScheduler, Metrics};
use tracing::{debug, trace};

use crate::engine::{GlobeEngine, PceCamera, PointCloudEngine};
use crate::registry::{Registry, SyncParts};

/// Distance along local +Y of the probe point that defines "up".
pub const UP_PROBE_DISTANCE: f64 = 600.0;
/// Squared length below which a direction or up vector is unusable.
pub const DEGENERATE_EPSILON: f64 = 1e-4;

/// Camera state in the point-cloud local frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraFrame {
    pub eye: Vec3,
    pub pivot: Vec3,
    pub up_probe: Vec3,
    pub fov_deg: f64,
    pub aspect: f64,
}

impl CameraFrame {
    pub fn new(camera: &PceCamera, pivot: Vec3) -> Self {
        Self {
            eye: camera.world.origin(),
            pivot,
            up_probe: camera.world.transform_point(Vec3::new(0.0, UP_PROBE_DISTANCE, 0.0)),
            fov_deg: camera.fov_deg,
            aspect: camera.aspect,
        }
    }
}

/// Camera state handed to the globe.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoCameraFrame {
    pub position: Geodetic,
    pub destination: Ecef,
    pub direction: Vec3,
    pub up: Vec3,
    pub fov_rad: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoData,
    NoCamera,
    Unprojectable(Unprojectable),
    Degenerate,
}

impl SkipReason {
    pub fn metric(self) -> &'static str {
        match self {
            SkipReason::NoData => "skipped.no_data",
            SkipReason::NoCamera => "skipped.no_camera",
            SkipReason::Unprojectable(_) => "skipped.unprojectable",
            SkipReason::Degenerate => "skipped.degenerate",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TickOutcome {
    Applied(GeoCameraFrame),
    Skipped(SkipReason),
    /// Not syncing, or a frame this engine no longer waits on.
    Ignored,
    /// The globe went away; the engine is back to `Idle`.
    Stopped,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
}

/// Field of view for the globe frustum.
///
/// The globe treats its FOV as vertical on portrait viewports and as
/// horizontal otherwise, so landscape viewports convert the viewer's
/// vertical FOV through the aspect ratio.
pub fn matched_fov(vfov_deg: f64, aspect: f64) -> f64 {
    let vfov = vfov_deg.to_radians();
    if aspect < 1.0 {
        vfov
    } else {
        2.0 * ((0.5 * vfov).tan() * aspect).atan()
    }
}

fn unit(v: Vec3) -> Result<Vec3, SkipReason> {
    if !v.is_finite() || v.length_squared() < DEGENERATE_EPSILON {
        return Err(SkipReason::Degenerate);
    }
    v.normalized().ok_or(SkipReason::Degenerate)
}

pub fn project_frame(
    frame: &CameraFrame,
    transform: &Transform,
    globe: &impl GlobeEngine,
) -> Result<GeoCameraFrame, SkipReason> {
    let to_globe = |local: Vec3| -> Result<(Geodetic, Ecef), SkipReason> {
        let geo = transform.forward(local).map_err(SkipReason::Unprojectable)?;
        Ok((geo, globe.cartesian_from_degrees(geo.lon_deg(), geo.lat_deg(), geo.alt_m)))
    };
    let (position, eye) = to_globe(frame.eye)?;
    let (_, pivot) = to_globe(frame.pivot)?;
    let (_, probe) = to_globe(frame.up_probe)?;

    Ok(GeoCameraFrame {
        position,
        destination: eye,
        direction: unit(pivot - eye)?,
        up: unit(probe - eye)?,
        fov_rad: matched_fov(frame.fov_deg, frame.aspect),
    })
}

/// Drives the globe camera from the viewer camera, one host frame at a time.
#[derive(Debug, Default)]
pub struct CameraSync {
    state: SyncState,
    frames: FrameLoop,
    metrics: Metrics,
}

impl CameraSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.frames.pending()
    }

    /// Enters `Syncing` when both handles exist and the globe is alive.
    pub fn start<P, G: GlobeEngine>(
        &mut self,
        registry: &Registry<P, G>,
        scheduler: &mut impl FrameScheduler,
    ) -> bool {
        if self.state == SyncState::Syncing {
            return true;
        }
        let alive = registry.globe().is_some_and(|g| !g.is_destroyed());
        if registry.viewer().is_none() || !alive {
            return false;
        }
        self.state = SyncState::Syncing;
        self.frames.schedule(scheduler);
        debug!("camera sync started");
        true
    }

    pub fn stop(&mut self, scheduler: &mut impl FrameScheduler) {
        self.frames.cancel(scheduler);
        if self.state == SyncState::Syncing {
            debug!("camera sync stopped");
        }
        self.state = SyncState::Idle;
    }

    pub fn tick<P: PointCloudEngine, G: GlobeEngine>(
        &mut self,
        handle: FrameHandle,
        frame: Frame,
        registry: &mut Registry<P, G>,
        scheduler: &mut impl FrameScheduler,
    ) -> TickOutcome {
        if self.state != SyncState::Syncing || !self.frames.fired(handle) {
            return TickOutcome::Ignored;
        }

        let mut captured = None;
        let result = {
            let SyncParts {
                viewer,
                globe,
                transform,
            } = registry.sync_parts();
            let (Some(viewer), Some(globe)) = (viewer, globe) else {
                self.stop(scheduler);
                return TickOutcome::Stopped;
            };
            if globe.is_destroyed() {
                self.stop(scheduler);
                return TickOutcome::Stopped;
            }

            self.frames.schedule(scheduler);
            self.metrics.inc_counter("ticks", 1);
            self.metrics.set_gauge("frame", frame.index as i64);

            let result = sync_once(viewer, transform, &*globe, &mut captured);
            if let Ok(geo) = &result {
                globe.set_view(geo.destination, geo.direction, geo.up);
                if !globe.set_perspective_fov(geo.fov_rad) {
                    self.metrics.inc_counter("fov.not_perspective", 1);
                }
            }
            globe.render();
            self.metrics.inc_counter("renders", 1);
            result
        };

        if let Some(reference) = captured {
            debug!(x = reference.x, y = reference.y, z = reference.z, "local reference captured");
            registry.note_reference(reference);
        }

        match result {
            Ok(geo) => {
                self.metrics.inc_counter("applied", 1);
                TickOutcome::Applied(geo)
            }
            Err(reason) => {
                trace!(frame = frame.index, ?reason, "camera update skipped");
                self.metrics.inc_counter(reason.metric(), 1);
                TickOutcome::Skipped(reason)
            }
        }
    }
}

fn sync_once<P: PointCloudEngine, G: GlobeEngine>(
    viewer: &P,
    transform: Option<&mut Transform>,
    globe: &G,
    captured: &mut Option<Vec3>,
) -> Result<GeoCameraFrame, SkipReason> {
    let bounds = viewer.point_cloud_bounds();
    if bounds.is_empty() {
        return Err(SkipReason::NoData);
    }
    let transform = transform.ok_or(SkipReason::Unprojectable(Unprojectable::NoReference))?;
    if transform.needs_reference() && bounds.iter().any(|b| transform.observe_bounds(b)) {
        *captured = transform.reference();
    }

    let camera = viewer.active_camera().ok_or(SkipReason::NoCamera)?;
    let pivot = viewer.pivot().ok_or(SkipReason::NoCamera)?;
    project_frame(&CameraFrame::new(&camera, pivot), transform, globe)
}

#[cfg(test)]
mod tests {
    use super::{CameraSync, SkipReason, SyncState, TickOutcome, matched_fov};
    use crate::engine::PceCamera;
    use crate::registry::{Registry, RegistryChange};
    use crate::testing::{FakeGlobe, FakeHost, FakeViewer};
    use foundation::bounds::Aabb3;
    use foundation::math::projection::{ProjectionConfig, Unprojectable, resolve};
    use foundation::math::{Mat4, Vec3};
    use foundation::time::Time;
    use runtime::{Frame, FrameHandle};

    fn frame(i: u64) -> Frame {
        let mut f = Frame::first(Time(0.0));
        f.index = i;
        f
    }

    fn camera_at(eye: Vec3) -> PceCamera {
        PceCamera {
            world: Mat4::from_translation(eye),
            fov_deg: 60.0,
            aspect: 2.0,
        }
    }

    fn syncing(
        projection: ProjectionConfig,
        viewer: FakeViewer,
    ) -> (CameraSync, Registry<FakeViewer, FakeGlobe>, FakeHost) {
        let mut host = FakeHost::with_containers(&[]);
        let mut registry = Registry::new("main");
        let t = resolve(&projection, 0.0).unwrap();
        registry.set_projection(Some((projection, t))).unwrap();
        registry.set_viewer(viewer);
        registry.set_globe(FakeGlobe::default()).unwrap();
        let mut sync = CameraSync::new();
        assert!(sync.start(&registry, &mut host));
        (sync, registry, host)
    }

    fn tick(
        sync: &mut CameraSync,
        registry: &mut Registry<FakeViewer, FakeGlobe>,
        host: &mut FakeHost,
    ) -> TickOutcome {
        let handle = sync.pending_frame().unwrap();
        tick_with(sync, registry, host, handle)
    }

    /// Delivers `handle` the way the host would, then ticks.
    fn tick_with(
        sync: &mut CameraSync,
        registry: &mut Registry<FakeViewer, FakeGlobe>,
        host: &mut FakeHost,
        handle: FrameHandle,
    ) -> TickOutcome {
        host.world_mut().fire(handle);
        sync.tick(handle, frame(handle.0), registry, host)
    }

    fn sf_eye() -> Vec3 {
        Vec3::new(551_131.0, 4_180_999.0, 200.0)
    }

    /// A kilometre north of the eye, on the ground.
    fn sf_pivot() -> Vec3 {
        Vec3::new(551_131.0, 4_181_999.0, 0.0)
    }

    fn sf_viewer(eye: Vec3, pivot: Vec3) -> FakeViewer {
        FakeViewer {
            camera: Some(camera_at(eye)),
            pivot: Some(pivot),
            bounds: vec![Aabb3::new(
                [550_000.0, 4_180_000.0, 0.0],
                [552_000.0, 4_182_000.0, 50.0],
            )],
            ..FakeViewer::default()
        }
    }

    #[test]
    fn fov_is_vertical_on_portrait_and_widened_on_landscape() {
        assert!((matched_fov(60.0, 2.0) - 1.714_143_895_700_262).abs() < 1e-12);
        assert!((matched_fov(60.0, 0.5) - 60f64.to_radians()).abs() < 1e-15);
        assert!((matched_fov(60.0, 1.0) - 60f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn start_requires_both_handles() {
        let mut host = FakeHost::with_containers(&[]);
        let mut registry: Registry<FakeViewer, FakeGlobe> = Registry::new("main");
        let mut sync = CameraSync::new();
        registry.set_viewer(FakeViewer::default());
        assert!(!sync.start(&registry, &mut host));
        assert_eq!(sync.state(), SyncState::Idle);
        assert_eq!(host.world().live_frames.len(), 0);
    }

    #[test]
    fn utm_camera_is_placed_over_san_francisco() {
        let eye = sf_eye();
        let viewer = sf_viewer(eye, sf_pivot());
        let (mut sync, mut registry, mut host) = syncing(ProjectionConfig::utm("10"), viewer);

        let TickOutcome::Applied(geo) = tick(&mut sync, &mut registry, &mut host) else {
            panic!("expected an applied update");
        };
        assert!((geo.position.lon_deg() - -122.4194).abs() < 0.01);
        assert!((geo.position.lat_deg() - 37.7749).abs() < 0.01);
        assert!((geo.position.alt_m - 200.0).abs() < 1e-9);
        assert!((geo.fov_rad - 1.714_143_895_700_262).abs() < 1e-12);

        let globe = registry.globe().unwrap();
        assert_eq!(globe.views.len(), 1);
        assert_eq!(globe.fovs, vec![geo.fov_rad]);
        assert_eq!(globe.renders.get(), 1);
        let (_, dir, up) = globe.views[0];
        assert!((dir.length() - 1.0).abs() < 1e-12);
        assert!((up.length() - 1.0).abs() < 1e-12);
        // Pivot lies north and below the eye.
        assert!(dir.z > 0.0);
    }

    #[test]
    fn each_tick_requests_the_next_frame_first() {
        let viewer = sf_viewer(sf_eye(), sf_pivot());
        let (mut sync, mut registry, mut host) = syncing(ProjectionConfig::utm("10"), viewer);
        let first = sync.pending_frame().unwrap();
        tick_with(&mut sync, &mut registry, &mut host, first);
        let second = sync.pending_frame().unwrap();
        assert_ne!(first, second);
        assert_eq!(host.world().live_frames, vec![second]);
        assert_eq!(sync.metrics().counter("ticks"), 1);
    }

    #[test]
    fn stale_frames_are_ignored() {
        let viewer = sf_viewer(sf_eye(), sf_pivot());
        let (mut sync, mut registry, mut host) = syncing(ProjectionConfig::utm("10"), viewer);
        let stale = FrameHandle(999);
        assert_eq!(tick_with(&mut sync, &mut registry, &mut host, stale), TickOutcome::Ignored);
        assert_eq!(registry.globe().unwrap().renders.get(), 0);
    }

    #[test]
    fn without_point_cloud_still_renders() {
        let viewer = FakeViewer {
            camera: Some(camera_at(Vec3::ZERO)),
            pivot: Some(Vec3::new(0.0, 10.0, 0.0)),
            ..FakeViewer::default()
        };
        let (mut sync, mut registry, mut host) = syncing(ProjectionConfig::Mercator, viewer);
        assert_eq!(
            tick(&mut sync, &mut registry, &mut host),
            TickOutcome::Skipped(SkipReason::NoData)
        );
        let globe = registry.globe().unwrap();
        assert!(globe.views.is_empty());
        assert_eq!(globe.renders.get(), 1);
        assert_eq!(sync.metrics().counter("skipped.no_data"), 1);
    }

    #[test]
    fn non_finite_camera_skips_update_but_renders() {
        let viewer = sf_viewer(Vec3::new(f64::NAN, 4_180_999.0, 200.0), sf_pivot());
        let (mut sync, mut registry, mut host) = syncing(ProjectionConfig::utm("10"), viewer);
        assert_eq!(
            tick(&mut sync, &mut registry, &mut host),
            TickOutcome::Skipped(SkipReason::Unprojectable(Unprojectable::NonFinite))
        );
        assert_eq!(registry.globe().unwrap().renders.get(), 1);
        assert!(registry.globe().unwrap().views.is_empty());
    }

    #[test]
    fn out_of_range_camera_skips_update() {
        let viewer = FakeViewer {
            camera: Some(camera_at(Vec3::new(3.0e7, 0.0, 10.0))),
            pivot: Some(Vec3::ZERO),
            bounds: vec![Aabb3::new([0.0; 3], [1.0; 3])],
            ..FakeViewer::default()
        };
        let (mut sync, mut registry, mut host) = syncing(ProjectionConfig::Mercator, viewer);
        assert_eq!(
            tick(&mut sync, &mut registry, &mut host),
            TickOutcome::Skipped(SkipReason::Unprojectable(Unprojectable::OutOfRange))
        );
    }

    #[test]
    fn pivot_at_eye_is_degenerate() {
        let eye = sf_eye();
        let (mut sync, mut registry, mut host) =
            syncing(ProjectionConfig::utm("10"), sf_viewer(eye, eye));
        assert_eq!(
            tick(&mut sync, &mut registry, &mut host),
            TickOutcome::Skipped(SkipReason::Degenerate)
        );
        let globe = registry.globe().unwrap();
        assert!(globe.views.is_empty());
        assert_eq!(globe.renders.get(), 1);
    }

    #[test]
    fn zero_scale_camera_matrix_is_degenerate() {
        let eye = sf_eye();
        let mut viewer = sf_viewer(eye, sf_pivot());
        viewer.camera = Some(PceCamera {
            world: Mat4::from_cols([
                [0.0; 4],
                [0.0; 4],
                [0.0; 4],
                [eye.x, eye.y, eye.z, 1.0],
            ]),
            fov_deg: 60.0,
            aspect: 1.5,
        });
        let (mut sync, mut registry, mut host) = syncing(ProjectionConfig::utm("10"), viewer);
        assert_eq!(
            tick(&mut sync, &mut registry, &mut host),
            TickOutcome::Skipped(SkipReason::Degenerate)
        );
        assert_eq!(registry.globe().unwrap().renders.get(), 1);
    }

    #[test]
    fn non_perspective_frustum_keeps_fov() {
        let viewer = sf_viewer(sf_eye(), sf_pivot());
        let (mut sync, mut registry, mut host) = syncing(ProjectionConfig::utm("10"), viewer);
        registry.globe_mut().unwrap().perspective = false;
        assert!(matches!(tick(&mut sync, &mut registry, &mut host), TickOutcome::Applied(_)));
        let globe = registry.globe().unwrap();
        assert_eq!(globe.views.len(), 1);
        assert!(globe.fovs.is_empty());
        assert_eq!(sync.metrics().counter("fov.not_perspective"), 1);
    }

    #[test]
    fn destroyed_globe_stops_sync() {
        let viewer = sf_viewer(sf_eye(), sf_pivot());
        let (mut sync, mut registry, mut host) = syncing(ProjectionConfig::utm("10"), viewer);
        registry.globe().unwrap().destroyed_flag().set(true);
        assert_eq!(tick(&mut sync, &mut registry, &mut host), TickOutcome::Stopped);
        assert_eq!(sync.state(), SyncState::Idle);
        assert_eq!(sync.pending_frame(), None);
        assert!(host.world().live_frames.is_empty());
        assert_eq!(registry.globe().unwrap().renders.get(), 0);
    }

    #[test]
    fn fixed_anchor_captures_reference_from_first_bounds() {
        let viewer = FakeViewer {
            camera: Some(camera_at(Vec3::new(0.0, -500.0, 300.0))),
            pivot: Some(Vec3::new(0.0, 0.0, 0.0)),
            bounds: vec![
                Aabb3::new([-100.0, -100.0, 5.0], [100.0, 100.0, 50.0]),
                Aabb3::new([1000.0, 1000.0, 0.0], [2000.0, 2000.0, 10.0]),
            ],
            ..FakeViewer::default()
        };
        let anchor = ProjectionConfig::FixedAnchor {
            longitude: 100.5,
            latitude: 13.75,
            height: 0.0,
        };
        let (mut sync, mut registry, mut host) = syncing(anchor, viewer);
        registry.drain_changes();

        let TickOutcome::Applied(geo) = tick(&mut sync, &mut registry, &mut host) else {
            panic!("expected an applied update");
        };
        assert!((geo.position.alt_m - 295.0).abs() < 1e-9);
        assert!(geo.position.lat_deg() < 13.75);
        assert_eq!(
            registry.drain_changes(),
            vec![RegistryChange::ReferenceCaptured(Vec3::new(0.0, 0.0, 5.0))]
        );

        tick(&mut sync, &mut registry, &mut host);
        assert!(registry.drain_changes().is_empty());
    }

    #[test]
    fn metrics_count_every_outcome() {
        let eye = sf_eye();
        let (mut sync, mut registry, mut host) =
            syncing(ProjectionConfig::utm("10"), sf_viewer(eye, sf_pivot()));
        tick(&mut sync, &mut registry, &mut host);
        registry.viewer_mut().unwrap().pivot = Some(eye);
        tick(&mut sync, &mut registry, &mut host);
        registry.viewer_mut().unwrap().camera = None;
        tick(&mut sync, &mut registry, &mut host);

        let m = sync.metrics();
        assert_eq!(m.counter("ticks"), 3);
        assert_eq!(m.counter("renders"), 3);
        assert_eq!(m.counter("applied"), 1);
        assert_eq!(m.counter("skipped.degenerate"), 1);
        assert_eq!(m.counter("skipped.no_camera"), 1);
        assert_eq!(m.counter_family("skipped."), 2);
        assert_eq!(m.gauge("frame"), Some(3));
    }
}
