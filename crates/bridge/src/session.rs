//! One mounted viewer: asset bootstrap, engine construction, camera sync and
//! the ready/error signals, driven entirely by host callbacks.
//!
//! The host calls [`ViewerSession::mount`] once, [`ViewerSession::pump`]
//! after every asset completion, [`ViewerSession::watch_load`] on each frame
//! while a bounded load is in progress, [`ViewerSession::tick`] from each
//! sync frame and [`ViewerSession::unmount`] when the viewer goes away. Observers pick
//! up signals through [`ViewerSession::dispatch_events`].

use assets::{AssetBootstrap, AssetHost, BootstrapStatus, LoadPlan, SharedAssetCache};
use foundation::math::projection::resolve;
use runtime::{EventBus, FrameClock, FrameHandle, FrameScheduler, Metrics};
use tracing::{debug, info, warn};

use crate::camera_sync::{CameraSync, SyncState, TickOutcome};
use crate::config::{BridgeConfig, ConfigError};
use crate::error::{BridgeError, Phase};
use crate::globe_bootstrap::{mount_globe, teardown_globe};
use crate::host::{GlobeHost, PceHost};
use crate::pce_bootstrap::{MountOutcome, mount_viewer, teardown_viewer};
use crate::readiness::ReadinessNotifier;
use crate::registry::Registry;

/// Everything a host must provide to run a session.
pub trait BridgeHost: AssetHost + PceHost + GlobeHost + FrameScheduler {}

impl<T> BridgeHost for T where T: AssetHost + PceHost + GlobeHost + FrameScheduler {}

pub type ViewerOf<H> = <H as PceHost>::Viewer;
pub type GlobeOf<H> = <H as GlobeHost>::Globe;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status(BootstrapStatus),
    ViewerMounted,
    GlobeMounted,
    Ready,
    Error { phase: Phase, error: BridgeError },
    SyncStopped,
    Unmounted,
}

/// Receives the session's external signals.
pub trait SessionObserver<P, G> {
    fn on_ready(&mut self, viewer: &P, globe: Option<&G>);
    fn on_error(&mut self, phase: Phase, error: &BridgeError);
}

pub struct ViewerSession<H: BridgeHost> {
    host: H,
    config: BridgeConfig,
    bootstrap: AssetBootstrap,
    registry: Registry<ViewerOf<H>, GlobeOf<H>>,
    sync: CameraSync,
    readiness: ReadinessNotifier,
    clock: FrameClock,
    events: EventBus<SessionEvent>,
    failure: Option<BridgeError>,
    unmounted: bool,
}

impl<H: BridgeHost> ViewerSession<H> {
    pub fn new(
        host: H,
        config: BridgeConfig,
        cache: SharedAssetCache,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let container_id = config.container_id.clone();
        let registry = match config.enabled_globe() {
            Some(globe) => {
                let transform = resolve(&globe.projection, globe.vertical_offset)?;
                Registry::with_projection(container_id, globe.projection.clone(), transform)
            }
            None => Registry::new(container_id),
        };
        let bootstrap = AssetBootstrap::new(config.load_plan(), cache)
            .with_load_timeout(config.assets.load_timeout_frames);
        let readiness = ReadinessNotifier::new(config.enabled_globe().is_some());
        Ok(Self {
            host,
            config,
            bootstrap,
            registry,
            sync: CameraSync::new(),
            readiness,
            clock: FrameClock::new(),
            events: EventBus::new(),
            failure: None,
            unmounted: false,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn plan(&self) -> &LoadPlan {
        self.bootstrap.plan()
    }

    pub fn status(&self) -> BootstrapStatus {
        self.registry.status()
    }

    pub fn error(&self) -> Option<&BridgeError> {
        self.failure.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.has_fired()
    }

    pub fn registry(&self) -> &Registry<ViewerOf<H>, GlobeOf<H>> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry<ViewerOf<H>, GlobeOf<H>> {
        &mut self.registry
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn sync_metrics(&self) -> &Metrics {
        self.sync.metrics()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.sync.pending_frame()
    }

    pub fn mount(&mut self) -> BootstrapStatus {
        if self.unmounted {
            return self.status();
        }
        debug!(container = %self.config.container_id, "mounting viewer session");
        self.bootstrap.start(&mut self.host);
        self.advance()
    }

    pub fn pump(&mut self) -> BootstrapStatus {
        if self.unmounted {
            return self.status();
        }
        self.bootstrap.pump(&mut self.host);
        self.advance()
    }

    /// Counts one animation frame against the configured load timeout.
    pub fn watch_load(&mut self) -> BootstrapStatus {
        if self.unmounted {
            return self.status();
        }
        self.bootstrap.tick_timeout();
        self.advance()
    }

    fn advance(&mut self) -> BootstrapStatus {
        if self.failure.is_some() {
            return self.status();
        }
        let status = self.bootstrap.status();
        self.set_status(status);
        match status {
            BootstrapStatus::Failed => {
                if let Some(err) = self.bootstrap.error().cloned() {
                    self.fail(err.into());
                }
            }
            BootstrapStatus::Ready => {
                if let Err(err) = self.mount_engines() {
                    self.fail(err);
                }
            }
            BootstrapStatus::Idle | BootstrapStatus::Loading => {}
        }
        self.status()
    }

    fn mount_engines(&mut self) -> Result<(), BridgeError> {
        let viewer = mount_viewer(&mut self.host, &mut self.registry, &self.config.viewer)?;
        if viewer == MountOutcome::Created {
            self.events.emit(SessionEvent::ViewerMounted);
            if self.readiness.viewer_published() {
                info!(container = %self.config.container_id, "viewer ready");
                self.events.emit(SessionEvent::Ready);
            }
        }

        let Some(globe) = self.config.enabled_globe() else {
            return Ok(());
        };
        let base_url = self.config.cesium_base_url();
        let globe = mount_globe(&mut self.host, &mut self.registry, globe, &base_url)?;
        if globe == MountOutcome::Created {
            self.events.emit(SessionEvent::GlobeMounted);
        }
        self.sync.start(&self.registry, &mut self.host);
        Ok(())
    }

    fn set_status(&mut self, status: BootstrapStatus) {
        if self.registry.status() != status {
            self.registry.set_status(status);
            self.events.emit(SessionEvent::Status(status));
        }
    }

    fn fail(&mut self, error: BridgeError) {
        let phase = error.phase();
        warn!(phase = phase.as_str(), error = %error, "viewer session failed");
        self.set_status(BootstrapStatus::Failed);
        self.events.emit(SessionEvent::Error {
            phase,
            error: error.clone(),
        });
        self.failure = Some(error);
    }

    /// Recovers from `Failed`: asset failures reload, init failures
    /// re-attempt construction.
    pub fn retry(&mut self) -> BootstrapStatus {
        if self.unmounted {
            return self.status();
        }
        let Some(error) = self.failure.take() else {
            return self.status();
        };
        debug!(code = error.code(), "retrying viewer session");
        if error.phase() == Phase::Assets {
            self.bootstrap.retry(&mut self.host);
        }
        self.advance()
    }

    /// Handles one animation frame delivered by the host.
    pub fn tick(&mut self, handle: FrameHandle, timestamp_ms: f64) -> TickOutcome {
        let frame = self.clock.advance(timestamp_ms);
        let outcome = self.sync.tick(handle, frame, &mut self.registry, &mut self.host);
        match outcome {
            TickOutcome::Applied(_) => {
                if self.readiness.sync_applied() {
                    info!(container = %self.config.container_id, "viewer and globe ready");
                    self.events.emit(SessionEvent::Ready);
                }
            }
            TickOutcome::Stopped => {
                warn!(
                    container = %self.config.container_id,
                    "globe destroyed, camera sync stopped"
                );
                teardown_globe(&mut self.host, &mut self.registry);
                self.events.emit(SessionEvent::SyncStopped);
            }
            TickOutcome::Skipped(_) | TickOutcome::Ignored => {}
        }
        outcome
    }

    /// Tears both engines down and nulls the registry. Shared asset loads
    /// are left to finish for other sessions.
    pub fn unmount(&mut self) {
        if self.unmounted {
            return;
        }
        self.sync.stop(&mut self.host);
        teardown_globe(&mut self.host, &mut self.registry);
        teardown_viewer(&mut self.host, &mut self.registry);
        self.registry.clear();
        self.readiness.reset();
        self.clock.reset();
        self.failure = None;
        self.unmounted = true;
        self.events.emit(SessionEvent::Unmounted);
        debug!(container = %self.config.container_id, "viewer session unmounted");
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain_payloads()
    }

    /// Delivers pending ready/error signals; returns how many events were drained.
    pub fn dispatch_events(
        &mut self,
        observer: &mut impl SessionObserver<ViewerOf<H>, GlobeOf<H>>,
    ) -> usize {
        let events = self.events.drain_payloads();
        for event in &events {
            match event {
                SessionEvent::Ready => {
                    if let Some(viewer) = self.registry.viewer() {
                        observer.on_ready(viewer, self.registry.globe());
                    }
                }
                SessionEvent::Error { phase, error } => observer.on_error(*phase, error),
                _ => {}
            }
        }
        events.len()
    }
}

impl<H: BridgeHost> Drop for ViewerSession<H> {
    fn drop(&mut self) {
        self.unmount();
    }
}
