use assets::BootstrapStatus;
use foundation::math::projection::{ProjectionConfig, Transform};
use foundation::math::{Geodetic, Vec3};
use runtime::EventBus;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("a globe handle requires a projection configuration")]
    GlobeWithoutProjection,
}

/// One entry of the registry's change log.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryChange {
    Viewer { present: bool },
    Globe { present: bool },
    Status(BootstrapStatus),
    Projection { kind: Option<&'static str> },
    ContainerId(String),
    ReferenceCaptured(Vec3),
    Cleared,
}

/// Shared per-session blackboard.
///
/// Writes are immediate and last-write-wins; each appends a
/// [`RegistryChange`] that observers drain. Absent handles mean "not yet
/// ready".
#[derive(Debug)]
pub struct Registry<P, G> {
    viewer: Option<P>,
    globe: Option<G>,
    status: BootstrapStatus,
    projection: Option<ProjectionConfig>,
    transform: Option<Transform>,
    container_id: String,
    changes: EventBus<RegistryChange>,
}

/// Borrows needed by one sync tick.
pub struct SyncParts<'a, P, G> {
    pub viewer: Option<&'a P>,
    pub globe: Option<&'a mut G>,
    pub transform: Option<&'a mut Transform>,
}

impl<P, G> Registry<P, G> {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            viewer: None,
            globe: None,
            status: BootstrapStatus::Idle,
            projection: None,
            transform: None,
            container_id: container_id.into(),
            changes: EventBus::new(),
        }
    }

    pub fn with_projection(
        container_id: impl Into<String>,
        config: ProjectionConfig,
        transform: Transform,
    ) -> Self {
        Self {
            projection: Some(config),
            transform: Some(transform),
            ..Self::new(container_id)
        }
    }

    pub fn viewer(&self) -> Option<&P> {
        self.viewer.as_ref()
    }

    pub fn viewer_mut(&mut self) -> Option<&mut P> {
        self.viewer.as_mut()
    }

    pub fn set_viewer(&mut self, viewer: P) {
        self.viewer = Some(viewer);
        self.changes.emit(RegistryChange::Viewer { present: true });
    }

    pub fn take_viewer(&mut self) -> Option<P> {
        let viewer = self.viewer.take();
        if viewer.is_some() {
            self.changes.emit(RegistryChange::Viewer { present: false });
        }
        viewer
    }

    pub fn globe(&self) -> Option<&G> {
        self.globe.as_ref()
    }

    pub fn globe_mut(&mut self) -> Option<&mut G> {
        self.globe.as_mut()
    }

    pub fn set_globe(&mut self, globe: G) -> Result<(), RegistryError> {
        if self.projection.is_none() {
            return Err(RegistryError::GlobeWithoutProjection);
        }
        self.globe = Some(globe);
        self.changes.emit(RegistryChange::Globe { present: true });
        Ok(())
    }

    pub fn take_globe(&mut self) -> Option<G> {
        let globe = self.globe.take();
        if globe.is_some() {
            self.changes.emit(RegistryChange::Globe { present: false });
        }
        globe
    }

    pub fn status(&self) -> BootstrapStatus {
        self.status
    }

    pub fn set_status(&mut self, status: BootstrapStatus) {
        if self.status != status {
            debug!(from = %self.status, to = %status, "bootstrap status");
            self.status = status;
            self.changes.emit(RegistryChange::Status(status));
        }
    }

    pub fn projection(&self) -> Option<&ProjectionConfig> {
        self.projection.as_ref()
    }

    /// Stores the projection together with its resolved transform.
    ///
    /// Removing the projection while a globe is published is rejected.
    pub fn set_projection(
        &mut self,
        projection: Option<(ProjectionConfig, Transform)>,
    ) -> Result<(), RegistryError> {
        if projection.is_none() && self.globe.is_some() {
            return Err(RegistryError::GlobeWithoutProjection);
        }
        let kind = projection.as_ref().map(|(config, _)| config.kind());
        (self.projection, self.transform) = match projection {
            Some((config, transform)) => (Some(config), Some(transform)),
            None => (None, None),
        };
        self.changes.emit(RegistryChange::Projection { kind });
        Ok(())
    }

    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    /// Anchor of a fixed-anchor projection.
    pub fn geo_anchor(&self) -> Option<Geodetic> {
        match &self.transform {
            Some(Transform::FixedAnchor(anchor)) => Some(anchor.anchor()),
            _ => None,
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn set_container_id(&mut self, id: impl Into<String>) {
        self.container_id = id.into();
        self.changes.emit(RegistryChange::ContainerId(self.container_id.clone()));
    }

    pub(crate) fn note_reference(&mut self, reference: Vec3) {
        self.changes.emit(RegistryChange::ReferenceCaptured(reference));
    }

    pub fn sync_parts(&mut self) -> SyncParts<'_, P, G> {
        SyncParts {
            viewer: self.viewer.as_ref(),
            globe: self.globe.as_mut(),
            transform: self.transform.as_mut(),
        }
    }

    pub fn changes(&self) -> &EventBus<RegistryChange> {
        &self.changes
    }

    pub fn drain_changes(&mut self) -> Vec<RegistryChange> {
        self.changes.drain_payloads()
    }

    /// Drops both handles and resets status for unmount. Callers tear the
    /// engines down before clearing.
    pub fn clear(&mut self) {
        self.globe = None;
        self.viewer = None;
        self.status = BootstrapStatus::Idle;
        self.changes.emit(RegistryChange::Cleared);
    }
}
