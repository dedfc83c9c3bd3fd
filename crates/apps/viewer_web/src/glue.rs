//! Page-side helpers for tag injection and the engine constructors.

use wasm_bindgen::prelude::*;

#[wasm_bindgen(inline_js = "
const PENDING = 'data-bridge-pending';
let __bridge_get_context = null;
let __bridge_patches = 0;

function __bridge_find(kind, url) {
    const selector = kind === 'script'
        ? `script[src=\"${url}\"]`
        : `link[rel=\"stylesheet\"][href=\"${url}\"]`;
    return document.querySelector(selector);
}

export function bridge_asset_present(kind, url) {
    const el = __bridge_find(kind, url);
    return !!el && !el.hasAttribute(PENDING);
}

export function bridge_inject_script(url, done) {
    const el = document.createElement('script');
    el.src = url;
    el.async = false;
    el.setAttribute(PENDING, '');
    el.onload = () => { el.removeAttribute(PENDING); done(true, ''); };
    el.onerror = () => { el.remove(); done(false, 'request failed'); };
    document.head.appendChild(el);
}

export function bridge_inject_stylesheet(url, done) {
    const el = document.createElement('link');
    el.rel = 'stylesheet';
    el.href = url;
    el.setAttribute(PENDING, '');
    el.onload = () => { el.removeAttribute(PENDING); done(true, ''); };
    el.onerror = () => { el.remove(); done(false, 'request failed'); };
    document.head.appendChild(el);
}

export function bridge_global_defined(name) {
    return typeof globalThis[name] !== 'undefined';
}

export function bridge_set_cesium_base(url) {
    globalThis.CESIUM_BASE_URL = url;
}

export function bridge_create_potree(containerId) {
    return new Potree.Viewer(document.getElementById(containerId));
}

export function bridge_potree_camera(viewer) {
    const cam = viewer.scene.getActiveCamera();
    if (!cam) return null;
    const fov = typeof cam.fov === 'number' ? cam.fov : NaN;
    const aspect = typeof cam.aspect === 'number' ? cam.aspect : NaN;
    return Float64Array.of(...cam.matrixWorld.elements, fov, aspect);
}

export function bridge_potree_pivot(viewer) {
    const p = viewer.scene.view.getPivot();
    return p ? Float64Array.of(p.x, p.y, p.z) : null;
}

export function bridge_potree_bounds(viewer) {
    const out = [];
    for (const pc of viewer.scene.pointclouds) {
        const box = pc.boundingBox;
        if (!box) continue;
        const o = pc.position;
        out.push(box.min.x + o.x, box.min.y + o.y, box.min.z + o.z,
                 box.max.x + o.x, box.max.y + o.y, box.max.z + o.z);
    }
    return Float64Array.from(out);
}

export function bridge_patch_canvas() {
    if (__bridge_patches++ > 0) return;
    const original = HTMLCanvasElement.prototype.getContext;
    __bridge_get_context = original;
    HTMLCanvasElement.prototype.getContext = function (type, options) {
        if (type === '2d') {
            return original.call(this, type, { ...options, willReadFrequently: true });
        }
        return original.call(this, type, options);
    };
}

export function bridge_unpatch_canvas() {
    if (__bridge_patches === 0 || --__bridge_patches > 0) return;
    HTMLCanvasElement.prototype.getContext = __bridge_get_context;
    __bridge_get_context = null;
}

export function bridge_create_cesium(containerId, baseUrl, kind, url, options) {
    Cesium.buildModuleUrl.setBaseUrl(`${baseUrl}/`);
    let imageryProvider;
    if (kind === 'arcgis') {
        imageryProvider = new Cesium.ArcGisMapServerImageryProvider({ url });
    } else if (kind === 'url') {
        imageryProvider = new Cesium.UrlTemplateImageryProvider({ url, maximumLevel: 19 });
    } else {
        imageryProvider = Cesium.createOpenStreetMapImageryProvider({ url });
    }

    let credits = document.getElementById('cesium-credits');
    if (!credits) {
        credits = document.createElement('div');
        credits.id = 'cesium-credits';
        document.body.appendChild(credits);
    }
    credits.style.display = options.showCredits ? '' : 'none';

    const widgets = options.showWidgets;
    return new Cesium.Viewer(document.getElementById(containerId), {
        useDefaultRenderLoop: options.useDefaultRenderLoop,
        animation: widgets,
        baseLayerPicker: widgets,
        fullscreenButton: widgets,
        geocoder: widgets,
        homeButton: widgets,
        infoBox: widgets,
        skyBox: false,
        sceneModePicker: widgets,
        selectionIndicator: widgets,
        timeline: widgets,
        navigationHelpButton: widgets,
        terrainShadows: options.terrainShadows
            ? Cesium.ShadowMode.ENABLED
            : Cesium.ShadowMode.DISABLED,
        imageryProvider,
        creditContainer: credits,
    });
}

export function bridge_cesium_set_view(viewer, p, d, u) {
    viewer.camera.setView({
        destination: new Cesium.Cartesian3(p[0], p[1], p[2]),
        orientation: {
            direction: new Cesium.Cartesian3(d[0], d[1], d[2]),
            up: new Cesium.Cartesian3(u[0], u[1], u[2]),
        },
    });
}

export function bridge_cesium_set_fov(viewer, fov) {
    const frustum = viewer.camera.frustum;
    if (!(frustum instanceof Cesium.PerspectiveFrustum)) return false;
    frustum.fov = fov;
    return true;
}
")]
extern "C" {
    pub fn bridge_asset_present(kind: &str, url: &str) -> bool;

    #[wasm_bindgen(catch)]
    pub fn bridge_inject_script(url: &str, done: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    pub fn bridge_inject_stylesheet(url: &str, done: &JsValue) -> Result<(), JsValue>;

    pub fn bridge_global_defined(name: &str) -> bool;

    pub fn bridge_set_cesium_base(url: &str);

    #[wasm_bindgen(catch)]
    pub fn bridge_create_potree(container_id: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub fn bridge_potree_camera(viewer: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub fn bridge_potree_pivot(viewer: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub fn bridge_potree_bounds(viewer: &JsValue) -> Result<JsValue, JsValue>;

    pub fn bridge_patch_canvas();

    pub fn bridge_unpatch_canvas();

    #[wasm_bindgen(catch)]
    pub fn bridge_create_cesium(
        container_id: &str,
        base_url: &str,
        kind: &str,
        url: &str,
        options: &JsValue,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    pub fn bridge_cesium_set_view(
        viewer: &JsValue,
        position: &[f64],
        direction: &[f64],
        up: &[f64],
    ) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    pub fn bridge_cesium_set_fov(viewer: &JsValue, fov: f64) -> Result<bool, JsValue>;
}

/// Human-readable text for a thrown JS value.
pub fn error_message(err: &JsValue) -> String {
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return String::from(e.message());
    }
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

/// Calls `target[method](...args)`.
pub fn invoke(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let func: js_sys::Function =
        js_sys::Reflect::get(target, &JsValue::from_str(method))?.dyn_into()?;
    let list: js_sys::Array = args.iter().collect();
    func.apply(target, &list)
}

pub fn warn(msg: &str) {
    web_sys::console::warn_1(&JsValue::from_str(msg));
}

/// Reads a `Float64Array` (or `null`) returned by a helper.
pub fn read_f64s(value: JsValue) -> Option<Vec<f64>> {
    if value.is_null() || value.is_undefined() {
        return None;
    }
    Some(js_sys::Float64Array::new(&value).to_vec())
}
