//! Host capabilities for constructing engines inside page containers.

use crate::config::ImageryProvider;
use crate::engine::{GlobeEngine, PointCloudEngine};

pub trait ContainerHost {
    fn container_exists(&self, id: &str) -> bool;
    /// Removes everything an engine rendered into the container.
    fn clear_container(&mut self, id: &str);
}

pub trait PceHost: ContainerHost {
    type Viewer: PointCloudEngine;

    fn create_viewer(&mut self, container_id: &str) -> Result<Self::Viewer, String>;
}

/// Construction options for the globe engine.
///
/// The bridge drives rendering itself and the globe is a backdrop, so the
/// defaults turn off the engine's own loop, widgets, shadows and credits.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeOptions {
    pub imagery: ImageryProvider,
    /// Directory the engine loads its workers and widget assets from.
    pub base_url: String,
    pub use_default_render_loop: bool,
    pub show_widgets: bool,
    pub terrain_shadows: bool,
    pub show_credits: bool,
}

impl GlobeOptions {
    pub fn new(imagery: ImageryProvider, base_url: impl Into<String>) -> Self {
        Self {
            imagery,
            base_url: base_url.into(),
            use_default_render_loop: false,
            show_widgets: false,
            terrain_shadows: false,
            show_credits: false,
        }
    }
}

pub trait GlobeHost: ContainerHost {
    type Globe: GlobeEngine;

    fn create_globe(
        &mut self,
        container_id: &str,
        options: &GlobeOptions,
    ) -> Result<Self::Globe, String>;

    /// Installs the canvas-context shim the globe needs for CPU read-back.
    fn patch_canvas(&mut self);
    fn unpatch_canvas(&mut self);
}
