use std::fmt;

use assets::{AssetError, AssetKind};
use serde::Serialize;

use crate::registry::RegistryError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Engine {
    PointCloud,
    Globe,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::PointCloud => f.write_str("point-cloud engine"),
            Engine::Globe => f.write_str("globe engine"),
        }
    }
}

/// Where in the mount sequence an error surfaced.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Assets,
    ViewerInit,
    GlobeInit,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Assets => "assets",
            Phase::ViewerInit => "viewerInit",
            Phase::GlobeInit => "globeInit",
        }
    }
}

/// Errors surfaced to the session's error observer.
///
/// All of them leave the session `Failed` and all are retryable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to load {kind} {url}: {reason}")]
    AssetLoad {
        kind: AssetKind,
        url: String,
        reason: String,
    },
    #[error("assets loaded but engine globals are missing: {}", missing.join(", "))]
    EngineMissing { missing: Vec<String> },
    #[error("{engine} container #{container_id} not found")]
    ContainerMissing {
        engine: Engine,
        container_id: String,
    },
    #[error("{engine} construction failed: {reason}")]
    EngineInit { engine: Engine, reason: String },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<AssetError> for BridgeError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::AssetLoad { kind, url, reason } => {
                BridgeError::AssetLoad { kind, url, reason }
            }
            AssetError::EngineMissing { missing } => BridgeError::EngineMissing { missing },
        }
    }
}

impl BridgeError {
    pub fn phase(&self) -> Phase {
        match self {
            BridgeError::AssetLoad { .. } | BridgeError::EngineMissing { .. } => Phase::Assets,
            BridgeError::ContainerMissing { engine, .. }
            | BridgeError::EngineInit { engine, .. } => match engine {
                Engine::PointCloud => Phase::ViewerInit,
                Engine::Globe => Phase::GlobeInit,
            },
            BridgeError::Registry(_) => Phase::GlobeInit,
        }
    }

    /// Stable machine-readable name, as reported to JavaScript.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::AssetLoad { .. } => "AssetLoad",
            BridgeError::EngineMissing { .. } => "EngineMissing",
            BridgeError::ContainerMissing { .. } => "ContainerMissing",
            BridgeError::EngineInit { .. } => "EngineInit",
            BridgeError::Registry(_) => "Registry",
        }
    }
}
