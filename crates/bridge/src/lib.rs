//! Keeps a globe engine's camera locked to a point-cloud engine's camera.
//!
//! A [`ViewerSession`] owns the per-viewer state: it bootstraps the engine
//! assets, constructs both engines once their containers exist, and then
//! mirrors the point-cloud camera onto the globe on every animation frame.

pub mod camera_sync;
pub mod config;
pub mod engine;
pub mod error;
pub mod globe_bootstrap;
pub mod host;
pub mod pce_bootstrap;
pub mod readiness;
pub mod registry;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use camera_sync::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use host::*;
pub use registry::*;
pub use session::*;
