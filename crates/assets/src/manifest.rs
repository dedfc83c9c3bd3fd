use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_PATH: &str = "/potree-static";

pub const POTREE_GLOBAL: &str = "Potree";
pub const CESIUM_GLOBAL: &str = "Cesium";

// Dependency order matters: three.js must precede the copc loader, and
// potree.js (the main bundle) must come last.
const POTREE_SCRIPTS: &[&str] = &[
    "lib/jquery/jquery-3.1.1.min.js",
    "lib/proj4/proj4.js",
    "lib/other/BinaryHeap.js",
    "lib/tween/tween.min.js",
    "lib/i18next/i18next.js",
    "lib/d3/d3.js",
    "lib/jstree/jstree.js",
    "lib/spectrum/spectrum.js",
    "lib/jquery-ui/jquery-ui.min.js",
    "lib/three.js/build/three.js",
    "lib/copc/index.js",
    "build/potree/potree.js",
];

const POTREE_STYLES: &[&str] = &[
    "build/potree/potree.css",
    "lib/jquery-ui/jquery-ui.css",
    "lib/spectrum/spectrum.css",
    "lib/jstree/themes/mixed/style.css",
];

const CESIUM_DIR: &str = "lib/Cesium";
const CESIUM_SCRIPTS: &[&str] = &["lib/Cesium/Cesium.js"];
const CESIUM_STYLES: &[&str] = &["lib/Cesium/Widgets/widgets.css"];

/// Runtime assets of one engine.
///
/// `scripts` is ordered; each script may depend on globals defined by the
/// ones before it. `styles` is a set and loads in any order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    pub scripts: Vec<String>,
    #[serde(default)]
    pub styles: BTreeSet<String>,
    #[serde(default)]
    pub required_globals: Vec<String>,
}

fn join(base_path: &str, rel: &str) -> String {
    format!("{}/{}", base_path.trim_end_matches('/'), rel)
}

impl AssetManifest {
    pub fn new(
        scripts: impl IntoIterator<Item = impl Into<String>>,
        styles: impl IntoIterator<Item = impl Into<String>>,
        required_globals: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            scripts: scripts.into_iter().map(Into::into).collect(),
            styles: styles.into_iter().map(Into::into).collect(),
            required_globals: required_globals.into_iter().map(Into::into).collect(),
        }
    }

    /// Point-cloud engine bundle as deployed under `base_path`.
    pub fn potree(base_path: &str) -> Self {
        Self::new(
            POTREE_SCRIPTS.iter().map(|s| join(base_path, s)),
            POTREE_STYLES.iter().map(|s| join(base_path, s)),
            [POTREE_GLOBAL],
        )
    }

    /// Globe engine bundle as deployed under `base_path`.
    pub fn cesium(base_path: &str) -> Self {
        Self::new(
            CESIUM_SCRIPTS.iter().map(|s| join(base_path, s)),
            CESIUM_STYLES.iter().map(|s| join(base_path, s)),
            [CESIUM_GLOBAL],
        )
    }

    /// The last script; by convention the engine's own bundle.
    pub fn main_bundle(&self) -> Option<&str> {
        self.scripts.last().map(String::as_str)
    }
}

/// Directory the globe engine resolves its workers and widgets from.
pub fn cesium_base_url(base_path: &str) -> String {
    join(base_path, CESIUM_DIR)
}
