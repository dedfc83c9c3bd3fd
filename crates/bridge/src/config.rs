//! Bridge configuration as loaded from JSON.
//!
//! Every field has a default matching the stock deployment, so `{}` is a
//! complete configuration.

use serde::{Deserialize, Serialize};

use assets::{AssetManifest, DEFAULT_BASE_PATH, LoadPlan, cesium_base_url};
use foundation::math::projection::{ProjectionConfig, ProjectionError, resolve};
use foundation::math::Geodetic;

/// Id of the point-cloud render area inside the viewer container.
pub const RENDER_AREA_ID: &str = "potree_render_area";
/// The engine's side-panel loader always binds to this id.
pub const SIDEBAR_CONTAINER_ID: &str = "potree_sidebar_container";

fn default_container_id() -> String {
    RENDER_AREA_ID.to_string()
}

pub fn globe_container_id(container_id: &str) -> String {
    format!("cesium_container_{container_id}")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("containerId must not be empty")]
    EmptyContainerId,
    #[error("fov must be within (0, 180) degrees, got {0}")]
    InvalidFov(f64),
    #[error("{field} must be positive")]
    InvalidPointBudget { field: &'static str },
    #[error("{field} must be finite and non-negative, got {value}")]
    InvalidEdl { field: &'static str, value: f64 },
    #[error("initial position is not a valid lon/lat/height: {longitude}, {latitude}, {height}")]
    InvalidInitialPosition {
        longitude: f64,
        latitude: f64,
        height: f64,
    },
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Background {
    Skybox,
    Gradient,
    Black,
    White,
}

impl Background {
    pub fn as_str(self) -> &'static str {
        match self {
            Background::Skybox => "skybox",
            Background::Gradient => "gradient",
            Background::Black => "black",
            Background::White => "white",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlMode {
    #[default]
    Orbit,
    Earth,
    FirstPerson,
}

impl ControlMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlMode::Orbit => "orbit",
            ControlMode::Earth => "earth",
            ControlMode::FirstPerson => "firstPerson",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Osm,
    ArcGis,
    UrlTemplate,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ImageryProvider {
    pub kind: ProviderKind,
    pub url: &'static str,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImagerySource {
    #[default]
    Osm,
    Esri,
    CartoVoyager,
    CartoVoyagerNolabels,
    CartoPositron,
    CartoPositronNolabels,
    CartoDark,
    CartoDarkNolabels,
}

impl ImagerySource {
    pub fn provider(self) -> ImageryProvider {
        let (kind, url) = match self {
            ImagerySource::Osm => (ProviderKind::Osm, "https://a.tile.openstreetmap.org/"),
            ImagerySource::Esri => (
                ProviderKind::ArcGis,
                "https://services.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer",
            ),
            ImagerySource::CartoVoyager => (
                ProviderKind::UrlTemplate,
                "https://basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}.png",
            ),
            ImagerySource::CartoVoyagerNolabels => (
                ProviderKind::UrlTemplate,
                "https://basemaps.cartocdn.com/rastertiles/voyager_nolabels/{z}/{x}/{y}.png",
            ),
            ImagerySource::CartoPositron => (
                ProviderKind::UrlTemplate,
                "https://basemaps.cartocdn.com/rastertiles/light_all/{z}/{x}/{y}.png",
            ),
            ImagerySource::CartoPositronNolabels => (
                ProviderKind::UrlTemplate,
                "https://basemaps.cartocdn.com/rastertiles/light_nolabels/{z}/{x}/{y}.png",
            ),
            ImagerySource::CartoDark => (
                ProviderKind::UrlTemplate,
                "https://basemaps.cartocdn.com/rastertiles/dark_all/{z}/{x}/{y}.png",
            ),
            ImagerySource::CartoDarkNolabels => (
                ProviderKind::UrlTemplate,
                "https://basemaps.cartocdn.com/rastertiles/dark_nolabels/{z}/{x}/{y}.png",
            ),
        };
        ImageryProvider { kind, url }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl Default for GeoPosition {
    fn default() -> Self {
        Self {
            longitude: 100.5,
            latitude: 13.75,
            height: 500_000.0,
        }
    }
}

impl GeoPosition {
    pub fn to_geodetic(self) -> Geodetic {
        Geodetic::from_degrees(self.longitude, self.latitude, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    pub fov: f64,
    pub point_budget: u64,
    pub point_budget_ceiling: u64,
    pub edl_enabled: bool,
    pub edl_radius: f64,
    pub edl_strength: f64,
    /// `None` keeps the canvas transparent so a globe shows through.
    pub background: Option<Background>,
    pub control_mode: ControlMode,
    pub show_sidebar: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov: 60.0,
            point_budget: 1_000_000,
            point_budget_ceiling: 10_000_000,
            edl_enabled: true,
            edl_radius: 1.4,
            edl_strength: 0.4,
            background: None,
            control_mode: ControlMode::Orbit,
            show_sidebar: true,
        }
    }
}

impl ViewerConfig {
    pub fn effective_point_budget(&self) -> u64 {
        self.point_budget.min(self.point_budget_ceiling)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobeConfig {
    pub enabled: bool,
    pub projection: ProjectionConfig,
    pub vertical_offset: f64,
    pub imagery_source: ImagerySource,
    pub initial_position: GeoPosition,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            projection: ProjectionConfig::Mercator,
            vertical_offset: 0.0,
            imagery_source: ImagerySource::Osm,
            initial_position: GeoPosition::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetConfig {
    pub base_path: String,
    /// Animation frames without script progress before a fetch counts as hung.
    pub load_timeout_frames: Option<u32>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            load_timeout_frames: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    #[serde(default = "default_container_id")]
    pub container_id: String,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub globe: Option<GlobeConfig>,
    #[serde(default)]
    pub assets: AssetConfig,
}

impl BridgeConfig {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            viewer: ViewerConfig::default(),
            globe: None,
            assets: AssetConfig::default(),
        }
    }

    pub fn with_globe(mut self, globe: GlobeConfig) -> Self {
        self.globe = Some(globe);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.container_id.trim().is_empty() {
            return Err(ConfigError::EmptyContainerId);
        }
        let v = &self.viewer;
        if !(v.fov > 0.0 && v.fov < 180.0) {
            return Err(ConfigError::InvalidFov(v.fov));
        }
        if v.point_budget == 0 {
            return Err(ConfigError::InvalidPointBudget {
                field: "pointBudget",
            });
        }
        if v.point_budget_ceiling == 0 {
            return Err(ConfigError::InvalidPointBudget {
                field: "pointBudgetCeiling",
            });
        }
        for (field, value) in [("edlRadius", v.edl_radius), ("edlStrength", v.edl_strength)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidEdl { field, value });
            }
        }
        if let Some(globe) = self.enabled_globe() {
            resolve(&globe.projection, globe.vertical_offset)?;
            let p = globe.initial_position;
            let geo = p.to_geodetic();
            if !geo.is_finite() || !geo.in_range() {
                return Err(ConfigError::InvalidInitialPosition {
                    longitude: p.longitude,
                    latitude: p.latitude,
                    height: p.height,
                });
            }
        }
        Ok(())
    }

    /// The globe section, if present and enabled.
    pub fn enabled_globe(&self) -> Option<&GlobeConfig> {
        self.globe.as_ref().filter(|g| g.enabled)
    }

    pub fn globe_container_id(&self) -> String {
        globe_container_id(&self.container_id)
    }

    pub fn cesium_base_url(&self) -> String {
        cesium_base_url(&self.assets.base_path)
    }

    pub fn load_plan(&self) -> LoadPlan {
        let pce = AssetManifest::potree(&self.assets.base_path);
        let globe = self
            .enabled_globe()
            .map(|_| AssetManifest::cesium(&self.assets.base_path));
        LoadPlan::compose(&pce, globe.as_ref())
    }
}
