//! Browser entry points: mount Potree viewers (optionally over a Cesium
//! globe) into page containers and drive them from DOM callbacks.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use assets::{AssetCache, BootstrapStatus, SharedAssetCache};
use bridge::{BridgeConfig, BridgeError, Phase, SessionObserver, ViewerSession};
use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use runtime::FrameHandle;
use wasm_bindgen::prelude::*;

mod engines;
mod glue;
mod host;

use engines::{CesiumGlobe, PotreeViewer};
use host::WebHost;

struct Mounted {
    session: ViewerSession<WebHost>,
    on_ready: Option<js_sys::Function>,
    on_error: Option<js_sys::Function>,
}

thread_local! {
    static CACHE: SharedAssetCache = AssetCache::shared();
    static SESSIONS: RefCell<BTreeMap<u32, Mounted>> = RefCell::new(BTreeMap::new());
    static NEXT_ID: Cell<u32> = const { Cell::new(1) };
}

enum Signal {
    Ready { viewer: JsValue, globe: JsValue },
    Error(JsValue),
}

#[derive(Default)]
struct Collector(Vec<Signal>);

impl SessionObserver<PotreeViewer, CesiumGlobe> for Collector {
    fn on_ready(&mut self, viewer: &PotreeViewer, globe: Option<&CesiumGlobe>) {
        self.0.push(Signal::Ready {
            viewer: viewer.handle().clone(),
            globe: globe.map_or(JsValue::NULL, |g| g.handle().clone()),
        });
    }

    fn on_error(&mut self, phase: Phase, error: &BridgeError) {
        self.0.push(Signal::Error(error_object(phase, error)));
    }
}

fn error_object(phase: Phase, error: &BridgeError) -> JsValue {
    let obj = js_sys::Object::new();
    for (key, value) in [
        ("code", error.code().to_string()),
        ("phase", phase.as_str().to_string()),
        ("message", error.to_string()),
    ] {
        let _ = js_sys::Reflect::set(&obj, &key.into(), &value.into());
    }
    obj.into()
}

/// Signals collected under the session borrow, delivered after it is released
/// so callbacks may call back into this module.
struct Delivery {
    on_ready: Option<js_sys::Function>,
    on_error: Option<js_sys::Function>,
    signals: Vec<Signal>,
}

impl Delivery {
    fn deliver(self) {
        for signal in self.signals {
            let result = match signal {
                Signal::Ready { viewer, globe } => match &self.on_ready {
                    Some(f) => f.call2(&JsValue::NULL, &viewer, &globe),
                    None => Ok(JsValue::UNDEFINED),
                },
                Signal::Error(err) => match &self.on_error {
                    Some(f) => f.call1(&JsValue::NULL, &err),
                    None => {
                        web_sys::console::error_1(&err);
                        Ok(JsValue::UNDEFINED)
                    }
                },
            };
            if let Err(err) = result {
                glue::warn(&format!("viewer callback threw: {}", glue::error_message(&err)));
            }
        }
    }
}

/// Runs `f` against a mounted session and delivers whatever it signalled.
/// Returns `None` when the session is gone.
fn drive<R>(id: u32, f: impl FnOnce(&mut ViewerSession<WebHost>) -> R) -> Option<R> {
    let (out, delivery) = SESSIONS.with(|sessions| {
        let mut sessions = sessions.borrow_mut();
        let mounted = sessions.get_mut(&id)?;
        let out = f(&mut mounted.session);
        let mut collector = Collector::default();
        mounted.session.dispatch_events(&mut collector);
        Some((
            out,
            Delivery {
                on_ready: mounted.on_ready.clone(),
                on_error: mounted.on_error.clone(),
                signals: collector.0,
            },
        ))
    })?;
    delivery.deliver();
    Some(out)
}

fn session_ids() -> Vec<u32> {
    SESSIONS.with(|sessions| sessions.borrow().keys().copied().collect())
}

/// An injected tag finished; every session waiting on it advances.
pub(crate) fn asset_settled(url: &str, outcome: Result<(), String>) {
    CACHE.with(|cache| cache.borrow_mut().complete(url, outcome));
    for id in session_ids() {
        drive(id, |s| s.pump());
    }
}

pub(crate) fn frame_fired(id: u32, handle: FrameHandle, timestamp_ms: f64) {
    drive(id, |s| s.tick(handle, timestamp_ms));
}

/// Counts frames against a bounded load until it settles.
fn schedule_watchdog(id: u32) {
    let callback = Closure::once_into_js(move |_timestamp: f64| {
        if drive(id, |s| s.watch_load()) == Some(BootstrapStatus::Loading) {
            schedule_watchdog(id);
        }
    });
    if let Some(window) = web_sys::window() {
        if let Err(err) = window.request_animation_frame(callback.unchecked_ref()) {
            glue::warn(&format!("requestAnimationFrame failed: {}", glue::error_message(&err)));
        }
    }
}

fn watch_if_loading(id: u32) {
    let bounded = SESSIONS.with(|sessions| {
        sessions.borrow().get(&id).is_some_and(|m| {
            m.session.config().assets.load_timeout_frames.is_some()
                && m.session.status() == BootstrapStatus::Loading
        })
    });
    if bounded {
        schedule_watchdog(id);
    }
}

/// Adds the globe's container behind the viewer container when the page
/// does not provide one.
fn ensure_globe_container(config: &BridgeConfig) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let globe_id = config.globe_container_id();
    if document.get_element_by_id(&globe_id).is_some() {
        return;
    }
    let Some(viewer) = document.get_element_by_id(&config.container_id) else {
        return;
    };
    let Some(parent) = viewer.parent_node() else {
        return;
    };
    let created = document.create_element("div").and_then(|div| {
        div.set_id(&globe_id);
        div.set_attribute("style", "position:absolute;top:0;left:0;width:100%;height:100%;")?;
        parent.insert_before(&div, Some(&viewer))
    });
    if let Err(err) = created {
        glue::warn(&format!("could not create #{globe_id}: {}", glue::error_message(&err)));
    }
}

fn mount_config(
    config: BridgeConfig,
    on_ready: Option<js_sys::Function>,
    on_error: Option<js_sys::Function>,
) -> Result<u32, JsValue> {
    if config.enabled_globe().is_some() {
        glue::bridge_set_cesium_base(&config.cesium_base_url());
        ensure_globe_container(&config);
    }
    let id = NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id.wrapping_add(1));
        id
    });
    let cache = CACHE.with(Rc::clone);
    let session = ViewerSession::new(WebHost::new(id), config, cache)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    SESSIONS.with(|sessions| {
        sessions.borrow_mut().insert(
            id,
            Mounted {
                session,
                on_ready,
                on_error,
            },
        )
    });
    drive(id, |s| s.mount());
    watch_if_loading(id);
    Ok(id)
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Mounts a viewer from a JSON configuration; returns its session id.
///
/// `on_ready(potreeViewer, cesiumViewer | null)` fires once;
/// `on_error({ code, phase, message })` fires on every failure.
#[wasm_bindgen]
pub fn mount_viewer(
    config_json: &str,
    on_ready: Option<js_sys::Function>,
    on_error: Option<js_sys::Function>,
) -> Result<u32, JsValue> {
    let config =
        BridgeConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    mount_config(config, on_ready, on_error)
}

#[wasm_bindgen]
pub async fn mount_viewer_from_url(
    url: String,
    on_ready: Option<js_sys::Function>,
    on_error: Option<js_sys::Function>,
) -> Result<u32, JsValue> {
    let text = fetch_text(&url).await?;
    mount_viewer(&text, on_ready, on_error)
}

#[wasm_bindgen]
pub fn retry_viewer(id: u32) -> Option<String> {
    let config = SESSIONS.with(|sessions| {
        sessions
            .borrow()
            .get(&id)
            .map(|m| m.session.config().clone())
    })?;
    if config.enabled_globe().is_some() {
        ensure_globe_container(&config);
    }
    let status = drive(id, |s| s.retry())?;
    watch_if_loading(id);
    Some(status.as_str().to_string())
}

#[wasm_bindgen]
pub fn unmount_viewer(id: u32) -> bool {
    let removed = SESSIONS.with(|sessions| sessions.borrow_mut().remove(&id));
    match removed {
        Some(mut mounted) => {
            mounted.session.unmount();
            true
        }
        None => false,
    }
}

#[wasm_bindgen]
pub fn viewer_status(id: u32) -> Option<String> {
    SESSIONS.with(|sessions| {
        sessions
            .borrow()
            .get(&id)
            .map(|m| m.session.status().as_str().to_string())
    })
}

/// The last failure as `{ code, phase, message }`, or `null`.
#[wasm_bindgen]
pub fn viewer_error(id: u32) -> JsValue {
    SESSIONS.with(|sessions| {
        sessions
            .borrow()
            .get(&id)
            .and_then(|m| m.session.error().map(|e| error_object(e.phase(), e)))
            .unwrap_or(JsValue::NULL)
    })
}

#[wasm_bindgen]
pub fn fit_viewer(id: u32) -> bool {
    use bridge::PointCloudEngine;

    drive(id, |s| match s.registry_mut().viewer_mut() {
        Some(viewer) => {
            viewer.fit_to_screen();
            true
        }
        None => false,
    })
    .unwrap_or(false)
}

/// Camera-sync counters and gauges as JSON.
#[wasm_bindgen]
pub fn viewer_metrics(id: u32) -> Option<String> {
    SESSIONS.with(|sessions| {
        let sessions = sessions.borrow();
        let snapshot = sessions.get(&id)?.session.sync_metrics().snapshot();
        let counters: BTreeMap<String, u64> = snapshot.counters.into_iter().collect();
        let gauges: BTreeMap<String, i64> = snapshot.gauges.into_iter().collect();
        Some(serde_json::json!({ "counters": counters, "gauges": gauges }).to_string())
    })
}

async fn fetch_text(url: &str) -> Result<String, JsValue> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    if !resp.ok() {
        return Err(JsValue::from_str(&format!("GET {url}: HTTP {}", resp.status())));
    }
    resp.text().await.map_err(|e| JsValue::from_str(&e.to_string()))
}
