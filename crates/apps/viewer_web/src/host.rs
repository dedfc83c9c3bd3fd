//! Browser implementation of the bridge host capabilities.

use std::cell::Cell;
use std::rc::Rc;

use assets::{AssetHost, AssetKind};
use bridge::{ContainerHost, GlobeHost, GlobeOptions, PceHost, ProviderKind};
use runtime::{FrameHandle, FrameScheduler};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::engines::{CesiumGlobe, PotreeViewer};
use crate::glue;

/// Host for one mounted session; page state is shared by all of them.
pub struct WebHost {
    session: u32,
}

impl WebHost {
    pub fn new(session: u32) -> Self {
        Self { session }
    }
}

fn document() -> Option<web_sys::Document> {
    web_sys::window()?.document()
}

/// Completion callback handed to an injected tag.
fn completion(url: &str) -> JsValue {
    let url = url.to_string();
    Closure::once_into_js(move |ok: bool, reason: String| {
        crate::asset_settled(&url, if ok { Ok(()) } else { Err(reason) });
    })
}

/// Reports an injection that threw. Completion is deferred because the
/// bootstrap may still hold the asset cache.
fn defer_failure(url: &str, err: JsValue) {
    let url = url.to_string();
    let reason = glue::error_message(&err);
    spawn_local(async move {
        crate::asset_settled(&url, Err(reason));
    });
}

impl AssetHost for WebHost {
    fn request_script(&mut self, url: &str) {
        if let Err(err) = glue::bridge_inject_script(url, &completion(url)) {
            defer_failure(url, err);
        }
    }

    fn request_stylesheet(&mut self, url: &str) {
        if let Err(err) = glue::bridge_inject_stylesheet(url, &completion(url)) {
            defer_failure(url, err);
        }
    }

    fn global_defined(&self, name: &str) -> bool {
        glue::bridge_global_defined(name)
    }

    fn asset_present(&self, kind: AssetKind, url: &str) -> bool {
        glue::bridge_asset_present(&kind.to_string(), url)
    }
}

impl ContainerHost for WebHost {
    fn container_exists(&self, id: &str) -> bool {
        document().and_then(|d| d.get_element_by_id(id)).is_some()
    }

    fn clear_container(&mut self, id: &str) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
            el.set_inner_html("");
        }
    }
}

impl PceHost for WebHost {
    type Viewer = PotreeViewer;

    fn create_viewer(&mut self, container_id: &str) -> Result<PotreeViewer, String> {
        glue::bridge_create_potree(container_id)
            .map(PotreeViewer::new)
            .map_err(|e| glue::error_message(&e))
    }
}

impl GlobeHost for WebHost {
    type Globe = CesiumGlobe;

    fn create_globe(
        &mut self,
        container_id: &str,
        options: &GlobeOptions,
    ) -> Result<CesiumGlobe, String> {
        let kind = match options.imagery.kind {
            ProviderKind::Osm => "osm",
            ProviderKind::ArcGis => "arcgis",
            ProviderKind::UrlTemplate => "url",
        };
        let flags = js_sys::Object::new();
        for (key, value) in [
            ("useDefaultRenderLoop", options.use_default_render_loop),
            ("showWidgets", options.show_widgets),
            ("terrainShadows", options.terrain_shadows),
            ("showCredits", options.show_credits),
        ] {
            js_sys::Reflect::set(&flags, &key.into(), &value.into())
                .map_err(|e| glue::error_message(&e))?;
        }
        let url = options.imagery.url;
        glue::bridge_create_cesium(container_id, &options.base_url, kind, url, &flags)
            .map(CesiumGlobe::new)
            .map_err(|e| glue::error_message(&e))
    }

    fn patch_canvas(&mut self) {
        glue::bridge_patch_canvas();
    }

    fn unpatch_canvas(&mut self) {
        glue::bridge_unpatch_canvas();
    }
}

impl FrameScheduler for WebHost {
    fn request_frame(&mut self) -> FrameHandle {
        let slot = Rc::new(Cell::new(0u64));
        let session = self.session;
        let fired = slot.clone();
        let callback = Closure::once_into_js(move |timestamp: f64| {
            crate::frame_fired(session, FrameHandle(fired.get()), timestamp);
        });
        let requested = web_sys::window()
            .ok_or_else(|| JsValue::from_str("no window"))
            .and_then(|w| w.request_animation_frame(callback.unchecked_ref()));
        match requested {
            Ok(id) => slot.set(id as u64),
            Err(err) => glue::warn(&format!(
                "requestAnimationFrame failed: {}",
                glue::error_message(&err)
            )),
        }
        FrameHandle(slot.get())
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(handle.0 as i32);
        }
    }
}
