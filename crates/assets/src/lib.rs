//! Ordered script/stylesheet bootstrap for the point-cloud and globe engines.
//!
//! A [`LoadPlan`] composes the engine manifests into one ordered script list.
//! An [`AssetBootstrap`] walks that list one script at a time against a
//! process-wide [`AssetCache`], so concurrent sessions never fetch a URL twice
//! and a plan that already reached `Ready` is reused immediately.

pub mod bootstrap;
pub mod cache;
pub mod error;
pub mod host;
pub mod manifest;
pub mod plan;

pub use bootstrap::*;
pub use cache::*;
pub use error::*;
pub use host::*;
pub use manifest::*;
pub use plan::*;
