use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Script,
    Stylesheet,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Script => f.write_str("script"),
            AssetKind::Stylesheet => f.write_str("stylesheet"),
        }
    }
}

/// What the bootstrap needs from the document it loads into.
///
/// Requests are fire-and-forget: the host reports each outcome through
/// [`crate::AssetCache::complete`] and then pumps every bootstrap.
pub trait AssetHost {
    fn request_script(&mut self, url: &str);
    fn request_stylesheet(&mut self, url: &str);
    fn global_defined(&self, name: &str) -> bool;

    /// Whether the document already carries this asset (e.g. a `<script src>`
    /// added by the page itself). Present assets count as loaded.
    fn asset_present(&self, _kind: AssetKind, _url: &str) -> bool {
        false
    }
}
